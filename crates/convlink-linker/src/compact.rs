//! Compact-Continuation Detector — C4 (§4.4).

use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use convlink_core::{hash_messages, BranchId, Domain, Hash, Message, StoredRequestSummary, StoreError};

use crate::store::StoreClient;

/// Sentinel prefix that marks a single-message request as a compact
/// continuation (§4.4).
pub const COMPACT_SENTINEL: &str =
    "This session is being continued from a previous conversation that ran out of context.";

const SUMMARY_MARKER: &str = "The conversation is summarized below:";
const CONTINUE_MARKER: &str = "Please continue";

/// True iff the (already normalized) text of a single-message request
/// begins with the compact-continuation sentinel (§4.4 / §4.8 step 3).
pub fn is_compact_trigger(normalized_text: &str) -> bool {
    normalized_text.starts_with(COMPACT_SENTINEL)
}

/// Extract the substring between the summary marker and the next
/// `"Please continue"` (or end of text) — §4.4 step 1.
pub fn extract_summary_region(text: &str) -> &str {
    let Some(marker_pos) = text.find(SUMMARY_MARKER) else {
        return "";
    };
    let after_marker = &text[marker_pos + SUMMARY_MARKER.len()..];
    match after_marker.find(CONTINUE_MARKER) {
        Some(end) => &after_marker[..end],
        None => after_marker,
    }
}

/// Lowercase, collapse internal whitespace runs to a single space, trim
/// (§4.4 step 2).
pub fn normalize_summary(region: &str) -> String {
    let lowered = region.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim().to_string()
}

/// The outcome of a successful compact-parent match.
#[derive(Debug, Clone)]
pub struct CompactMatch {
    pub parent: StoredRequestSummary,
    pub branch_id: BranchId,
    /// `parent_message_hash` to set on the `LinkResult` — ordinarily the
    /// parent's own `current_message_hash`, but replaced with a freshly
    /// recomputed hash when `HashMismatch` verification (§7) catches drift
    /// between the stored hash and the parent's actual stored messages.
    pub parent_message_hash: Hash,
}

/// Run the compact-continuation path (§4.4 + §4.8 step 3).
///
/// `normalized_text` is the post-normalization text of the request's single
/// message; `domain`/`timestamp` identify the search scope. Returns `None`
/// on a miss — the caller then falls through to "fresh conversation root"
/// (§4.4 step 5).
#[instrument(skip(store, cancel), fields(domain = %domain))]
pub async fn try_compact_link<S: StoreClient + ?Sized>(
    store: &S,
    domain: &Domain,
    normalized_text: &str,
    timestamp: i64,
    cancel: &CancellationToken,
) -> Result<Option<CompactMatch>, StoreError> {
    if !is_compact_trigger(normalized_text) {
        return Ok(None);
    }

    let region = extract_summary_region(normalized_text);
    let normalized_summary = normalize_summary(region);

    let found = store
        .find_compact_parent(domain, &normalized_summary, None, timestamp, cancel)
        .await?;

    let Some(parent) = found else {
        return Ok(None);
    };

    let parent_message_hash = verify_and_resolve_hash(&parent);
    let branch_id = BranchId::compact(&convlink_core::clock::format_hhmmss(timestamp));

    Ok(Some(CompactMatch {
        parent,
        branch_id,
        parent_message_hash,
    }))
}

/// Apply §7's `HashMismatch` policy: when the candidate's own stored
/// messages are available (optional field on `StoredRequestSummary`),
/// recompute the hash over them and compare against the stored
/// `current_message_hash`. On mismatch, log a warning and use the freshly
/// computed hash — the link still succeeds either way. When stored messages
/// aren't available, trust the stored hash as-is.
fn verify_and_resolve_hash(parent: &StoredRequestSummary) -> Hash {
    let Some(messages) = parent.stored_messages.as_deref() else {
        return parent.current_message_hash.clone();
    };
    match recompute_hash(messages) {
        Some(recomputed) if recomputed != parent.current_message_hash => {
            warn!(
                request_id = %parent.request_id,
                stored = %parent.current_message_hash,
                recomputed = %recomputed,
                "compact parent hash mismatch; using freshly computed hash"
            );
            recomputed
        }
        Some(_) => parent.current_message_hash.clone(),
        None => parent.current_message_hash.clone(),
    }
}

fn recompute_hash(messages: &[Message]) -> Option<Hash> {
    hash_messages(messages).ok()
}
