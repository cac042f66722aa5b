//! Linker Orchestrator — C8 (§4.8).
//!
//! Wires the normalizer/hasher (C1/C2) and the four resolution stages
//! (C4–C7) into the single public entry point this whole system exists to
//! provide: turning an incoming request's messages into conversation
//! coordinates.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use convlink_core::model::{LinkResult, LinkingRequest};
use convlink_core::{hash, Clock, LinkError, LinkerConfig};

use crate::branch::allocate_branch;
use crate::compact::try_compact_link;
use crate::resolver::{looks_like_summarization_prompt, resolve_parent};
use crate::store::{FindParentsCriteria, StoreClient};
use crate::subtask::try_subtask_link;

/// Drop the final two messages before hashing, producing the hash the
/// previous turn's own `current_message_hash` would have recorded (§4.8:
/// "parentMessageHash = hashMessages(messages[0..N-2])"). `None` when fewer
/// than three messages are present.
///
/// §3 states `parent_message_hash` is null "iff request has ≤1 message or is
/// compact" — read literally that would require a value at N=2, but
/// `messages[0..0]` is empty and `hash_messages` (§4.1) fails fatally on an
/// empty list. Treating N=2 the same as N<2 here (no parent hash, fall
/// through to "fresh conversation root") is the one place this function
/// departs from §3's literal wording rather than implementing it exactly;
/// see DESIGN.md's "parent_message_hash when N=2" entry for the rationale.
fn compute_parent_message_hash(request: &LinkingRequest) -> Result<Option<convlink_core::Hash>, LinkError> {
    let n = request.messages.len();
    if n < 3 {
        return Ok(None);
    }
    let prefix = &request.messages[..n - 2];
    Ok(Some(hash::hash_messages(prefix)?))
}

/// Assigns `conversation_id`/`branch_id`/`parent_request_id` coordinates to
/// an incoming request, given a pluggable store and an injected clock.
pub struct Linker<S: StoreClient> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LinkerConfig,
}

impl<S: StoreClient> Linker<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: LinkerConfig) -> Self {
        Self { store, clock, config }
    }

    /// Resolve this request's conversation coordinates (§4.8).
    ///
    /// `request.timestamp` is used verbatim when present; when `None`, it is
    /// resolved exactly once here, from the clock handed to `Linker::new` —
    /// every downstream stage receives that single resolved value and never
    /// reads wall-clock time itself.
    #[instrument(skip(self, request, cancel), fields(domain = %request.domain, request_id = %request.request_id))]
    pub async fn link(
        &self,
        request: LinkingRequest,
        cancel: &CancellationToken,
    ) -> Result<LinkResult, LinkError> {
        let current_message_hash = hash::hash_messages(&request.messages)?;
        let system_hash = hash::hash_system(request.system_prompt.as_ref());
        let timestamp = request.timestamp.unwrap_or_else(|| self.clock.now_ms());

        crate::store::check_cancelled(cancel)?;

        // Stage C4: compact-continuation detector. Only a single-message,
        // user-role request beginning with the compact sentinel can match
        // (§4.8 step 3: "first message is user AND begins with ...").
        if request.messages.len() == 1 && request.messages[0].role == convlink_core::model::Role::User {
            if let Some(text) = single_message_text(&request) {
                if let Some(compact) = try_compact_link(
                    self.store.as_ref(),
                    &request.domain,
                    &text,
                    timestamp,
                    cancel,
                )
                .await?
                {
                    return Ok(LinkResult {
                        conversation_id: Some(compact.parent.conversation_id),
                        parent_request_id: Some(compact.parent.request_id),
                        branch_id: compact.branch_id,
                        current_message_hash,
                        parent_message_hash: Some(compact.parent_message_hash),
                        system_hash,
                        is_subtask: Some(false),
                        parent_task_request_id: None,
                        subtask_sequence: None,
                    });
                }
            }
        }

        crate::store::check_cancelled(cancel)?;

        // Stage C5: sub-task matcher.
        if let Some(subtask) = try_subtask_link(
            self.store.as_ref(),
            &request.domain,
            &request.messages,
            timestamp,
            self.config.subtask_window_secs,
            cancel,
        )
        .await?
        {
            return Ok(LinkResult {
                conversation_id: Some(subtask.conversation_id),
                parent_request_id: None,
                branch_id: subtask.branch_id,
                current_message_hash,
                parent_message_hash: None,
                system_hash,
                is_subtask: Some(true),
                parent_task_request_id: Some(subtask.parent_task_request_id),
                subtask_sequence: Some(subtask.sequence),
            });
        }

        crate::store::check_cancelled(cancel)?;

        // Stage C6/C7: ordinary parent resolution + branch allocation.
        let parent_message_hash = compute_parent_message_hash(&request)?;
        if let Some(ref parent_hash) = parent_message_hash {
            let relaxed_eligible = request
                .system_prompt
                .as_ref()
                .map(|p| looks_like_summarization_prompt(&hash::normalize_system(p)))
                .unwrap_or(false);

            let resolved = resolve_parent(
                self.store.as_ref(),
                &request.domain,
                parent_hash,
                system_hash.as_ref(),
                (request.messages.len() - 2) as u32,
                &request.request_id,
                timestamp,
                relaxed_eligible,
                cancel,
            )
            .await?;

            if let Some(parent) = resolved {
                crate::store::check_cancelled(cancel)?;

                let siblings_criteria = FindParentsCriteria {
                    domain: request.domain.clone(),
                    parent_message_hash: Some(parent.current_message_hash.clone()),
                    conversation_id: Some(parent.conversation_id.clone()),
                    exclude_request_id: Some(request.request_id.clone()),
                    before_timestamp: Some(timestamp),
                    ..Default::default()
                };
                let siblings = self.store.find_parents(&siblings_criteria, cancel).await?;
                let existing_children: Vec<_> = siblings.into_iter().map(|s| s.branch_id).collect();

                let branch_id = allocate_branch(&parent.branch_id, &existing_children, timestamp);

                return Ok(LinkResult {
                    conversation_id: Some(parent.conversation_id),
                    parent_request_id: Some(parent.request_id),
                    branch_id,
                    current_message_hash,
                    parent_message_hash,
                    system_hash,
                    is_subtask: Some(false),
                    parent_task_request_id: None,
                    subtask_sequence: None,
                });
            }
        }

        // Fresh conversation root (§4.8 final step / I5).
        Ok(LinkResult::new_root(
            current_message_hash,
            parent_message_hash,
            system_hash,
        ))
    }
}

fn single_message_text(request: &LinkingRequest) -> Option<String> {
    use convlink_core::model::Content;
    use convlink_core::normalize::normalize_text;

    let message = request.messages.first()?;
    let raw = match &message.content {
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
    Some(normalize_text(&raw))
}
