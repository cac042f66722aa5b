//! Parent Resolver — C6 (§4.6).
//!
//! Finds the stored request this one continues, searching in three
//! progressively looser tiers so a summarization rewrite of the system
//! prompt doesn't sever an otherwise-unambiguous continuation.

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use convlink_core::model::{Domain, MessageHash, RequestId, StoredRequestSummary, SystemHash};
use convlink_core::StoreError;

use crate::store::{FindParentsCriteria, StoreClient, SystemHashCriterion};

/// Case-insensitive heuristic for whether a system prompt looks like a
/// summarization wrapper, making the relaxed tier eligible (§4.6: "relaxed
/// via a `summariz` heuristic"). Matches "summarize", "summarise",
/// "summarization", "summarizing", etc.
pub fn looks_like_summarization_prompt(system_prompt_text: &str) -> bool {
    system_prompt_text.to_lowercase().contains("summariz")
}

/// Run the three-tier parent search (§4.6 + §4.8 step 5).
///
/// `parent_message_hash` is the hash already computed over the candidate
/// parent's expected message state (by convention, the current request's
/// messages minus its last two); it is matched against each candidate row's
/// own `current_message_hash`.
#[instrument(skip(store, cancel), fields(domain = %domain))]
pub async fn resolve_parent<S: StoreClient + ?Sized>(
    store: &S,
    domain: &Domain,
    parent_message_hash: &MessageHash,
    system_hash: Option<&SystemHash>,
    message_count: u32,
    exclude_request_id: &RequestId,
    before_timestamp: i64,
    relaxed_tier_eligible: bool,
    cancel: &CancellationToken,
) -> Result<Option<StoredRequestSummary>, StoreError> {
    let base = FindParentsCriteria {
        domain: domain.clone(),
        current_message_hash: Some(parent_message_hash.clone()),
        exclude_request_id: Some(exclude_request_id.clone()),
        before_timestamp: Some(before_timestamp),
        ..Default::default()
    };

    // Tier 1: exact — system prompt and message count both pinned.
    let exact = FindParentsCriteria {
        message_count: Some(message_count),
        system_hash: match system_hash {
            Some(h) => SystemHashCriterion::Equals(h.clone()),
            None => SystemHashCriterion::IsNull,
        },
        ..base.clone()
    };
    if let Some(found) = query_best(store, &exact, cancel).await? {
        return Ok(Some(found));
    }

    // Tier 2: relaxed — only tried when the live system prompt looks like a
    // summarization wrapper, so the system hash is allowed to differ.
    if relaxed_tier_eligible {
        let relaxed = FindParentsCriteria {
            message_count: Some(message_count),
            system_hash: SystemHashCriterion::Ignore,
            ..base.clone()
        };
        if let Some(found) = query_best(store, &relaxed, cancel).await? {
            return Ok(Some(found));
        }
    }

    // Tier 3: message-only fallback — match on message state alone.
    let message_only = FindParentsCriteria {
        message_count: None,
        system_hash: SystemHashCriterion::Ignore,
        ..base
    };
    query_best(store, &message_only, cancel).await
}

async fn query_best<S: StoreClient + ?Sized>(
    store: &S,
    criteria: &FindParentsCriteria,
    cancel: &CancellationToken,
) -> Result<Option<StoredRequestSummary>, StoreError> {
    let mut candidates = store.find_parents(criteria, cancel).await?;
    Ok(pick_best(&mut candidates))
}

/// Newest timestamp first; ties broken by the lexicographically greatest
/// `request_id` (§4.6 tie-break rule).
fn pick_best(candidates: &mut Vec<StoredRequestSummary>) -> Option<StoredRequestSummary> {
    candidates.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.request_id.cmp(&a.request_id))
    });
    candidates.drain(..).next()
}
