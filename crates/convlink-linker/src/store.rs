//! Store capability interface (§6).
//!
//! The linker never knows whether the backing store is SQL, an in-memory
//! map, or a network RPC — it only calls through this trait, the same way
//! `skynet_agent::provider::LlmProvider` abstracts over Anthropic/OpenAI/
//! Ollama/Bedrock behind one async trait. Callbacks-as-closures (the
//! original system's approach, per §9 design notes) are replaced with one
//! capability interface implementations can wrap for caching or
//! instrumentation without the linker knowing.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use convlink_core::{ConversationId, Domain, MessageHash, RequestId, StoreError, SystemHash};
use convlink_core::{StoredRequestSummary, TaskInvocation};

/// Null-significant system-hash criterion for `find_parents` (§6: "When
/// systemHash is explicitly set to null, rows with null system_hash match;
/// when it is omitted, the criterion is ignored").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SystemHashCriterion {
    /// The criterion is not part of the query.
    #[default]
    Ignore,
    /// Match rows whose `system_hash` equals this value.
    Equals(SystemHash),
    /// Match rows whose `system_hash` is `NULL`.
    IsNull,
}

/// Search criteria for `StoreClient::find_parents` (§6).
#[derive(Debug, Clone, Default)]
pub struct FindParentsCriteria {
    pub domain: Domain,
    pub message_count: Option<u32>,
    pub current_message_hash: Option<MessageHash>,
    pub parent_message_hash: Option<MessageHash>,
    pub system_hash: SystemHashCriterion,
    pub exclude_request_id: Option<RequestId>,
    pub before_timestamp: Option<i64>,
    pub conversation_id: Option<ConversationId>,
}

/// The four store capabilities the linker depends on (§6). Implementations
/// are free to back this with SQL, an in-memory map, or a network RPC — the
/// linker is generic over any implementation and holds no mutable state of
/// its own (§5).
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Up to 100 rows, newest first (§6).
    async fn find_parents(
        &self,
        criteria: &FindParentsCriteria,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredRequestSummary>, StoreError>;

    /// Response-content prefix match described in §4.4. `after_timestamp` is
    /// the lower bound of the bounded search window; `before_timestamp` is
    /// the incoming request's own timestamp (candidates must precede it).
    async fn find_compact_parent(
        &self,
        domain: &Domain,
        summary_prefix: &str,
        after_timestamp: Option<i64>,
        before_timestamp: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<StoredRequestSummary>, StoreError>;

    /// Entries whose response contained a `name="Task"` tool use within
    /// `[reference_time - window, reference_time]` (§6). `prompt_filter` is
    /// an optimisation hint only — when supplied, the store MAY restrict to
    /// exact-equality matches on `prompt`, but MUST return the complete set
    /// when `prompt_filter` is `None` so sequence numbering (§4.5 point 4)
    /// can be computed correctly by the caller.
    async fn find_task_invocations(
        &self,
        domain: &Domain,
        reference_time: i64,
        window_secs: u64,
        prompt_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskInvocation>, StoreError>;

    /// Largest N such that `branch_id = subtask_N` exists in `conversation_id`
    /// before `before_timestamp`, or 0 (§6).
    async fn get_max_subtask_sequence(
        &self,
        conversation_id: &ConversationId,
        before_timestamp: i64,
        cancel: &CancellationToken,
    ) -> Result<u32, StoreError>;
}

/// Check a cancellation token and turn it into a `StoreError` if fired.
/// Called at every suspension point so `Linker::link` never performs a
/// write after the caller asked it to stop (§5).
pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}
