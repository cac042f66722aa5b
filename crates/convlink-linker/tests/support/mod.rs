//! In-memory `StoreClient` fixture for scenario tests. Not part of the
//! public API — test-only scaffolding standing in for a real database.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use convlink_core::model::{
    BranchId, ConversationId, Domain, MessageHash, StoredRequest, StoredRequestSummary, SystemHash,
    TaskInvocation,
};
use convlink_core::StoreError;
use convlink_linker::store::{FindParentsCriteria, StoreClient, SystemHashCriterion};

fn check_cancelled(cancel: &CancellationToken) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<StoredRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, row: StoredRequest) {
        self.rows.lock().unwrap().push(row);
    }

    fn to_summary(row: &StoredRequest) -> StoredRequestSummary {
        StoredRequestSummary {
            request_id: row.request_id.clone(),
            conversation_id: row.conversation_id.clone(),
            branch_id: row.branch_id.clone(),
            current_message_hash: row.current_message_hash.clone(),
            system_hash: row.system_hash.clone(),
            timestamp: row.timestamp,
            stored_messages: None,
        }
    }
}

#[async_trait]
impl StoreClient for InMemoryStore {
    async fn find_parents(
        &self,
        criteria: &FindParentsCriteria,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredRequestSummary>, StoreError> {
        check_cancelled(cancel)?;
        let rows = self.rows.lock().unwrap();
        let mut matches: Vec<StoredRequestSummary> = rows
            .iter()
            .filter(|row| row.domain == criteria.domain)
            .filter(|row| {
                criteria
                    .current_message_hash
                    .as_ref()
                    .map(|h| &row.current_message_hash == h)
                    .unwrap_or(true)
            })
            .filter(|row| {
                criteria
                    .parent_message_hash
                    .as_ref()
                    .map(|h| row.parent_message_hash.as_ref() == Some(h))
                    .unwrap_or(true)
            })
            .filter(|row| match &criteria.system_hash {
                SystemHashCriterion::Ignore => true,
                SystemHashCriterion::Equals(h) => row.system_hash.as_ref() == Some(h),
                SystemHashCriterion::IsNull => row.system_hash.is_none(),
            })
            .filter(|row| {
                criteria
                    .message_count
                    .map(|n| row.message_count == n)
                    .unwrap_or(true)
            })
            .filter(|row| {
                criteria
                    .exclude_request_id
                    .as_ref()
                    .map(|id| &row.request_id != id)
                    .unwrap_or(true)
            })
            .filter(|row| {
                criteria
                    .before_timestamp
                    .map(|t| row.timestamp < t)
                    .unwrap_or(true)
            })
            .filter(|row| {
                criteria
                    .conversation_id
                    .as_ref()
                    .map(|c| &row.conversation_id == c)
                    .unwrap_or(true)
            })
            .map(Self::to_summary)
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches.truncate(100);
        Ok(matches)
    }

    async fn find_compact_parent(
        &self,
        domain: &Domain,
        summary_prefix: &str,
        after_timestamp: Option<i64>,
        before_timestamp: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<StoredRequestSummary>, StoreError> {
        check_cancelled(cancel)?;
        let rows = self.rows.lock().unwrap();
        let mut candidates: Vec<&StoredRequest> = rows
            .iter()
            .filter(|row| &row.domain == domain)
            .filter(|row| row.timestamp < before_timestamp)
            .filter(|row| after_timestamp.map(|t| row.timestamp >= t).unwrap_or(true))
            .filter(|row| {
                row.response_body
                    .as_deref()
                    .unwrap_or("")
                    .to_lowercase()
                    .contains(summary_prefix)
            })
            .collect();
        candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(candidates.first().map(|row| Self::to_summary(row)))
    }

    async fn find_task_invocations(
        &self,
        domain: &Domain,
        reference_time: i64,
        window_secs: u64,
        prompt_filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskInvocation>, StoreError> {
        check_cancelled(cancel)?;
        let rows = self.rows.lock().unwrap();
        let window_ms = (window_secs as i64) * 1000;
        let invocations: Vec<TaskInvocation> = rows
            .iter()
            .filter(|row| &row.domain == domain)
            .filter(|row| {
                row.timestamp <= reference_time && row.timestamp >= reference_time - window_ms
            })
            .filter_map(|row| {
                let calls = row.task_tool_invocation.as_ref()?;
                Some(calls.iter().map(move |call| TaskInvocation {
                    request_id: row.request_id.clone(),
                    conversation_id: row.conversation_id.clone(),
                    tool_use_id: call.id.clone(),
                    prompt: call
                        .input
                        .get("prompt")
                        .or_else(|| call.input.get("description"))
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    timestamp: row.timestamp,
                }))
            })
            .flatten()
            .filter(|inv| prompt_filter.map(|f| inv.prompt == f).unwrap_or(true))
            .collect();
        Ok(invocations)
    }

    async fn get_max_subtask_sequence(
        &self,
        conversation_id: &ConversationId,
        before_timestamp: i64,
        cancel: &CancellationToken,
    ) -> Result<u32, StoreError> {
        check_cancelled(cancel)?;
        let rows = self.rows.lock().unwrap();
        let max = rows
            .iter()
            .filter(|row| &row.conversation_id == conversation_id)
            .filter(|row| row.timestamp < before_timestamp)
            .filter_map(|row| {
                row.branch_id
                    .as_str()
                    .strip_prefix("subtask_")
                    .and_then(|n| n.parse::<u32>().ok())
            })
            .max()
            .unwrap_or(0);
        Ok(max)
    }
}

pub fn make_row(
    request_id: &str,
    domain: &str,
    conversation_id: &str,
    branch_id: BranchId,
    timestamp: i64,
    current_message_hash: MessageHash,
    parent_message_hash: Option<MessageHash>,
    system_hash: Option<SystemHash>,
    message_count: u32,
) -> StoredRequest {
    StoredRequest {
        request_id: request_id.to_string(),
        domain: domain.to_string(),
        timestamp,
        conversation_id: conversation_id.to_string(),
        branch_id,
        current_message_hash,
        parent_message_hash,
        system_hash,
        message_count,
        is_subtask: false,
        parent_task_request_id: None,
        task_tool_invocation: None,
        response_body: None,
    }
}

