//! Injected time source.
//!
//! The linker must never read wall-clock time mid-computation (see
//! `SPEC_FULL.md` §9 / design notes): every timestamp it needs is either
//! supplied on the incoming request or resolved exactly once, at call entry,
//! through a `Clock` handed to the orchestrator at construction time. This
//! replaces the `new Date()`-at-point-of-use pattern the original system
//! used with an explicit seam, the same way `skynet-sessions::manager` takes
//! `chrono::Utc::now()` calls out of business logic and into one place per
//! operation.

use chrono::{DateTime, Timelike, Utc};

/// A source of the current time, expressed as milliseconds since the Unix
/// epoch (matching the `branch_<unix-ms>` wire format in §6).
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock implementation used by production callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Deterministic clock for tests — always returns the same instant unless
/// advanced explicitly.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Format a unix-ms timestamp as zero-padded UTC `HHMMSS`, used to mint
/// `compact_HHMMSS` branch ids (§4.4).
pub fn format_hhmmss(timestamp_ms: i64) -> String {
    let dt = millis_to_datetime(timestamp_ms);
    format!("{:02}{:02}{:02}", dt.hour(), dt.minute(), dt.second())
}

/// Convert a unix-ms timestamp to a UTC `DateTime`. Out-of-range values clamp
/// to the Unix epoch rather than panicking — a malformed/garbage timestamp
/// should never crash the linker.
pub fn millis_to_datetime(timestamp_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let c = FixedClock(1_700_000_000_000);
        assert_eq!(c.now_ms(), c.now_ms());
    }

    #[test]
    fn hhmmss_is_zero_padded() {
        // 2024-01-01T00:00:05Z
        let ts = DateTime::parse_from_rfc3339("2024-01-01T00:00:05Z")
            .unwrap()
            .timestamp_millis();
        assert_eq!(format_hhmmss(ts), "000005");
    }

    #[test]
    fn hhmmss_roundtrips_known_time() {
        let ts = DateTime::parse_from_rfc3339("2024-06-15T13:45:09Z")
            .unwrap()
            .timestamp_millis();
        assert_eq!(format_hhmmss(ts), "134509");
    }
}
