use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Width, in seconds, of the sub-task match window (§4.5: `W = 30 seconds`).
pub const DEFAULT_SUBTASK_WINDOW_SECS: u64 = 30;
/// Upper bound on rows returned by `find_parents` (§6: "up to 100 rows").
pub const DEFAULT_MAX_CANDIDATES: usize = 100;

/// Tunable constants for the linker, loadable from `convlink.toml` with
/// `CONVLINK_`-prefixed environment overrides — the same loading pattern as
/// `SkynetConfig::load` in the reference workspace's `skynet-core::config`.
///
/// The spec leaves these as fixed prose constants (`W = 30 seconds`, "up to
/// 100 rows"); externalizing them is an ambient-stack addition so a host
/// embedding this core can tune them per deployment without a recompile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Sub-task match window width, in seconds (§4.5).
    #[serde(default = "default_subtask_window_secs")]
    pub subtask_window_secs: u64,
    /// Max candidate rows requested from `find_parents` per query (§6).
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            subtask_window_secs: DEFAULT_SUBTASK_WINDOW_SECS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

fn default_subtask_window_secs() -> u64 {
    DEFAULT_SUBTASK_WINDOW_SECS
}
fn default_max_candidates() -> usize {
    DEFAULT_MAX_CANDIDATES
}

impl LinkerConfig {
    /// Load config from an optional TOML file path, with `CONVLINK_*` env
    /// var overrides layered on top. Falls back to defaults when the file
    /// is absent — callers embedding this core inside a larger proxy are
    /// expected to supply their own path resolution upstream.
    pub fn load(config_path: Option<&str>) -> Result<Self, LinkError> {
        let mut figment = Figment::from(figment::providers::Serialized::defaults(
            LinkerConfig::default(),
        ));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("CONVLINK_"));

        figment
            .extract()
            .map_err(|e| LinkError::Store(crate::error::StoreError::Unavailable(anyhow::anyhow!(e))))
    }

    /// Sub-task window as a `chrono::Duration`, for arithmetic against
    /// millisecond timestamps.
    pub fn subtask_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.subtask_window_secs as i64)
    }
}
