//! Sub-task Matcher — C5 (§4.5).
//!
//! Recognizes a request as the single synthetic user turn a `Task` tool
//! invocation spawns, and assigns it the next `subtask_N` sequence number
//! within its parent's conversation.

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use convlink_core::model::{Content, ConversationId, Domain, Message, Role, TaskInvocation};
use convlink_core::{normalize::normalize_text, BranchId, StoreError};

use crate::store::StoreClient;

const SUBTASK_WINDOW_SECS_DEFAULT: u64 = 30;

/// Outcome of a successful sub-task match.
#[derive(Debug, Clone)]
pub struct SubtaskMatch {
    pub parent_task_request_id: String,
    pub conversation_id: ConversationId,
    pub branch_id: BranchId,
    pub sequence: u32,
}

/// True iff the request consists of exactly one user-role message whose
/// normalized text is non-empty (§4.5 gate).
fn passes_gate(messages: &[Message]) -> Option<String> {
    let [only] = messages else { return None };
    if only.role != Role::User {
        return None;
    }
    let text = match &only.content {
        Content::Text(s) => s.clone(),
        Content::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                convlink_core::model::ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
    };
    let normalized = normalize_text(&text);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Undo the literal `\n` escaping a transport layer may have applied to a
/// stored prompt/description before comparing it against the live message
/// text (§4.5: "after `\n`-unescape").
fn unescape_literal_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// Run the sub-task matching path (§4.5 + §4.8 step 4).
#[instrument(skip(store, cancel), fields(domain = %domain))]
pub async fn try_subtask_link<S: StoreClient + ?Sized>(
    store: &S,
    domain: &Domain,
    messages: &[Message],
    timestamp: i64,
    window_secs: u64,
    cancel: &CancellationToken,
) -> Result<Option<SubtaskMatch>, StoreError> {
    let Some(normalized_text) = passes_gate(messages) else {
        return Ok(None);
    };

    let window = if window_secs == 0 {
        SUBTASK_WINDOW_SECS_DEFAULT
    } else {
        window_secs
    };

    let candidates = store
        .find_task_invocations(domain, timestamp, window, None, cancel)
        .await?;

    let matched = select_best_match(&candidates, &normalized_text);

    let Some(invocation) = matched else {
        return Ok(None);
    };

    let max_sequence = store
        .get_max_subtask_sequence(&invocation.conversation_id, timestamp, cancel)
        .await?;
    let sequence = max_sequence + 1;

    Ok(Some(SubtaskMatch {
        parent_task_request_id: invocation.request_id.clone(),
        conversation_id: invocation.conversation_id.clone(),
        branch_id: BranchId::subtask(sequence),
        sequence,
    }))
}

/// Pick the invocation whose (unescaped) prompt equals the normalized
/// message text, breaking ties by newest timestamp (§4.5 point 3).
fn select_best_match<'a>(
    candidates: &'a [TaskInvocation],
    normalized_text: &str,
) -> Option<&'a TaskInvocation> {
    candidates
        .iter()
        .filter(|c| unescape_literal_newlines(&c.prompt) == normalized_text)
        .max_by_key(|c| c.timestamp)
}
