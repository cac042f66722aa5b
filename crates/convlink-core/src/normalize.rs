//! Content Normalizer — C1.
//!
//! Maps any accepted message shape to one canonical byte string per message
//! so hashing is invariant under benign encoding choices (§4.1). The
//! normalizer parses once into [`NormalizedMessage`]/[`NormalizedPart`] and
//! every later stage (hashing, display, diagnostics) matches over that
//! union instead of re-deriving shape from `Content`/`ContentPart` — the
//! "parse once at the boundary" design note in §9.

use serde_json::Value;

use crate::error::LinkError;
use crate::model::{Content, ContentPart, Message, SystemPrompt};
use crate::reminder::strip_reminders;

/// A message after normalization: role plus the ordered, deduplicated,
/// whitespace-normalized parts that survive §4.1.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub role: crate::model::Role,
    pub parts: Vec<NormalizedPart>,
}

/// A content part after normalization. `Image` parts never appear here —
/// they are dropped in step 5.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedPart {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
    },
}

impl NormalizedPart {
    fn kind(&self) -> &'static str {
        match self {
            NormalizedPart::Text(_) => "text",
            NormalizedPart::ToolUse { .. } => "tool_use",
            NormalizedPart::ToolResult { .. } => "tool_result",
        }
    }

    fn payload(&self) -> String {
        match self {
            NormalizedPart::Text(t) => t.clone(),
            NormalizedPart::ToolUse { id, name, input } => {
                format!("{id}|{name}|{}", canonical_json(input))
            }
            NormalizedPart::ToolResult { tool_use_id, content } => {
                format!("{tool_use_id}|{}", canonical_string(content))
            }
        }
    }
}

/// Normalize a full message list (§4.1). Fails with `EmptyMessages` when
/// given a zero-length list, per §4.1's explicit failure mode (mirrored by
/// `Linker::link`'s own step-1 check before any work happens).
pub fn normalize_messages(messages: &[Message]) -> Result<Vec<NormalizedMessage>, LinkError> {
    if messages.is_empty() {
        return Err(LinkError::EmptyMessages);
    }
    Ok(messages.iter().map(normalize_message).collect())
}

fn normalize_message(message: &Message) -> NormalizedMessage {
    // Step 1: string content becomes a one-element [text{S}] sequence.
    let raw_parts: Vec<ContentPart> = match &message.content {
        Content::Text(s) => vec![ContentPart::Text { text: s.clone() }],
        Content::Parts(parts) => parts.clone(),
    };

    // Steps 2-3: strip reminder spans + surrounding whitespace from text
    // parts, discard text parts that became empty, trim remaining text,
    // normalize line endings.
    let stripped: Vec<ContentPart> = raw_parts
        .into_iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => {
                let normalized = normalize_text(&text);
                if normalized.is_empty() {
                    None
                } else {
                    Some(ContentPart::Text { text: normalized })
                }
            }
            other => Some(other),
        })
        .collect();

    // Step 4: dedup consecutive tool_use parts with equal id, and
    // consecutive tool_result parts with equal tool_use_id. Dedup is
    // message-local and only collapses strictly adjacent duplicates, so it
    // must run before image parts (step 5) are dropped — an image between
    // two equal tool_use ids would make them non-consecutive.
    let deduped = dedup_consecutive(stripped);

    // Step 5: drop image and other non-hashable parts.
    let parts: Vec<NormalizedPart> = deduped
        .into_iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(NormalizedPart::Text(text)),
            ContentPart::ToolUse { id, name, input } => {
                Some(NormalizedPart::ToolUse { id, name, input })
            }
            ContentPart::ToolResult {
                tool_use_id,
                content,
            } => Some(NormalizedPart::ToolResult {
                tool_use_id,
                content,
            }),
            ContentPart::Image { .. } => None,
        })
        .collect();

    // Step 6: messages with zero remaining parts are still retained.
    NormalizedMessage {
        role: message.role,
        parts,
    }
}

fn dedup_consecutive(parts: Vec<ContentPart>) -> Vec<ContentPart> {
    let mut out: Vec<ContentPart> = Vec::with_capacity(parts.len());
    for part in parts {
        let is_dup = match (&part, out.last()) {
            (
                ContentPart::ToolUse { id, .. },
                Some(ContentPart::ToolUse { id: prev_id, .. }),
            ) => id == prev_id,
            (
                ContentPart::ToolResult { tool_use_id, .. },
                Some(ContentPart::ToolResult {
                    tool_use_id: prev_id,
                    ..
                }),
            ) => tool_use_id == prev_id,
            _ => false,
        };
        if !is_dup {
            out.push(part);
        }
    }
    out
}

/// Apply §4.1 steps 2-3 to a single text string: strip reminder spans,
/// trim leading/trailing whitespace, normalize CRLF to LF.
pub fn normalize_text(text: &str) -> String {
    let stripped = strip_reminders(text);
    let crlf_normalized = stripped.replace("\r\n", "\n");
    crlf_normalized.trim().to_string()
}

/// Serialize a JSON value with lexicographically sorted object keys and no
/// whitespace (§4.1 `canonical-json`). `serde_json::Map` is backed by a
/// `BTreeMap` by default (the `preserve_order` feature is not enabled
/// anywhere in this workspace), so keys are already sorted before
/// serialization — `to_string` alone produces the canonical form.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// `canonical-string` for `tool_result.content` (§4.1): when the content is
/// itself a JSON string, apply the same text-normalization rules as a
/// `text` part; otherwise (array/object content blocks) fall back to
/// `canonical-json`. The spec does not spell out which of the two applies —
/// this choice is recorded as a resolved open question in `DESIGN.md`.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_text(s),
        other => canonical_json(other),
    }
}

/// Canonical byte serialization of a normalized message list, fed to the
/// hasher (§4.1): `role\n` then, per part, `[i]kind:payload\n`.
pub fn serialize_message(message: &NormalizedMessage) -> String {
    let mut out = String::new();
    out.push_str(role_str(message.role));
    out.push('\n');
    for (i, part) in message.parts.iter().enumerate() {
        out.push('[');
        out.push_str(&i.to_string());
        out.push(']');
        out.push_str(part.kind());
        out.push(':');
        out.push_str(&part.payload());
        out.push('\n');
    }
    out
}

fn role_str(role: crate::model::Role) -> &'static str {
    match role {
        crate::model::Role::User => "user",
        crate::model::Role::Assistant => "assistant",
        crate::model::Role::System => "system",
    }
}

/// Flatten a system prompt to an ordered sequence of (already
/// reminder-stripped-and-trimmed) text elements, per §4.2's `hashSystem`
/// description ("flattening to a text sequence").
pub fn flatten_system_prompt(prompt: &SystemPrompt) -> Vec<String> {
    match prompt {
        SystemPrompt::Single(s) => vec![normalize_text(s)],
        SystemPrompt::Parts(parts) => parts
            .iter()
            .map(|p| normalize_text(&p.text))
            .collect(),
    }
}
