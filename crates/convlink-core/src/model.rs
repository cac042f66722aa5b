//! Core data model (§3).
//!
//! Tagged unions replace the runtime duck-typing the original system used
//! for message content (§9 design notes: "parse once at the boundary into
//! this union and operate on it thereafter"). Hash and branch-id strings get
//! their own validated newtypes, following the `UserId`/`SessionKey` newtype
//! idiom from `skynet-core::types` / `skynet-sessions::types`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single content part within a message. Ordering within a message is
/// significant for hashing (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Opaque blob reference — dropped entirely during normalization (§4.1
    /// step 5); carried in the model only so callers can round-trip the
    /// original request shape.
    Image { reference: String },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: serde_json::Value,
    },
}

/// The `content` field of a message: either a bare string or an ordered
/// sequence of content parts (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single entry in a request's message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }
}

/// A single part of a system prompt. The `cache_control` marker is carried
/// only as a wire-format annotation — it never affects hashing (§3), the
/// same treatment the teacher's `SystemPrompt` 3-tier type gives
/// `cache_control` in `to_anthropic_blocks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPromptPart {
    pub text: String,
    /// Present only to mirror the wire shape; ignored everywhere in this
    /// crate (§3: "ignored for hashing").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<serde_json::Value>,
}

/// The request's system prompt: absent, a single string, or an ordered
/// sequence of text parts (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    Single(String),
    Parts(Vec<SystemPromptPart>),
}

/// A validated 64-hex-character digest (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(String);

impl Hash {
    /// Wrap an already-computed lowercase hex digest. Only the hasher module
    /// should call this — it is `pub(crate)` plus one public escape hatch
    /// (`from_hex`) for store adapters reconstructing a `Hash` from a
    /// persisted column.
    pub(crate) fn from_lowercase_hex(s: String) -> Self {
        debug_assert_eq!(s.len(), 64, "hash must be 64 hex chars");
        debug_assert!(s.bytes().all(|b| b.is_ascii_hexdigit()), "hash must be hex");
        Self(s)
    }

    /// Parse a hash string read back from storage. Returns `None` if it is
    /// not a well-formed 64-hex-character string.
    pub fn from_hex(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(s.to_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `current_message_hash` — always present on a `LinkResult`/`StoredRequest`.
pub type MessageHash = Hash;
/// `system_hash` — absent when the system prompt is absent or empty.
pub type SystemHash = Hash;

/// A validated branch id matching the grammar in §6:
/// `main | compact_[0-9]{6} | branch_[0-9]+ | subtask_[1-9][0-9]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchId(String);

impl BranchId {
    pub const MAIN: &'static str = "main";

    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    pub fn compact(hhmmss: &str) -> Self {
        debug_assert_eq!(hhmmss.len(), 6);
        debug_assert!(hhmmss.bytes().all(|b| b.is_ascii_digit()));
        Self(format!("compact_{hhmmss}"))
    }

    pub fn branch(unix_ms: i64) -> Self {
        debug_assert!(unix_ms >= 0);
        Self(format!("branch_{unix_ms}"))
    }

    pub fn subtask(n: u32) -> Self {
        debug_assert!(n >= 1);
        Self(format!("subtask_{n}"))
    }

    /// Parse and validate a branch id read back from storage.
    pub fn parse(s: &str) -> Option<Self> {
        if s == Self::MAIN {
            return Some(Self(s.to_string()));
        }
        if let Some(rest) = s.strip_prefix("compact_") {
            if rest.len() == 6 && rest.bytes().all(|b| b.is_ascii_digit()) {
                return Some(Self(s.to_string()));
            }
            return None;
        }
        if let Some(rest) = s.strip_prefix("branch_") {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return Some(Self(s.to_string()));
            }
            return None;
        }
        if let Some(rest) = s.strip_prefix("subtask_") {
            if !rest.is_empty()
                && rest.bytes().all(|b| b.is_ascii_digit())
                && !rest.starts_with('0')
            {
                return Some(Self(s.to_string()));
            }
            return None;
        }
        None
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque request identifier.
pub type RequestId = String;
/// Opaque tenant partition key (§1 / GLOSSARY: "domain").
pub type Domain = String;
/// Conversation root identifier, minted downstream when `None`.
pub type ConversationId = String;

/// The external store's row, as consumed by the linker (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRequest {
    pub request_id: RequestId,
    pub domain: Domain,
    pub timestamp: i64,
    pub conversation_id: ConversationId,
    pub branch_id: BranchId,
    pub current_message_hash: MessageHash,
    pub parent_message_hash: Option<MessageHash>,
    pub system_hash: Option<SystemHash>,
    pub message_count: u32,
    pub is_subtask: bool,
    pub parent_task_request_id: Option<RequestId>,
    pub task_tool_invocation: Option<Vec<TaskToolCall>>,
    pub response_body: Option<String>,
}

/// A `Task`-tool invocation captured from a stored response, as referenced
/// by §4.5/§6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Minimal projection of a `StoredRequest` returned by `find_parents` /
/// `find_compact_parent` (§6: "at minimum" the six fields below — this type
/// adds one optional field beyond that floor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRequestSummary {
    pub request_id: RequestId,
    pub conversation_id: ConversationId,
    pub branch_id: BranchId,
    pub current_message_hash: MessageHash,
    pub system_hash: Option<SystemHash>,
    pub timestamp: i64,
    /// The stored request's own message list, when the store implementation
    /// can supply it cheaply. Populated only for compact-parent candidates
    /// returned by `find_compact_parent`, where §7's `HashMismatch`
    /// verification needs it; `find_parents` results leave this `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_messages: Option<Vec<Message>>,
}

/// A `Task`-tool invocation entry returned by `find_task_invocations` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub request_id: RequestId,
    /// Conversation the invoking request belongs to — needed so the
    /// sub-task matcher can scope `get_max_subtask_sequence` to the right
    /// conversation without a fifth store round-trip (§6 lists the six
    /// capability fields as a floor; this is the one addition beyond it).
    pub conversation_id: ConversationId,
    pub tool_use_id: String,
    pub prompt: String,
    pub timestamp: i64,
}

/// Public input to `Linker::link` (§4.8).
#[derive(Debug, Clone)]
pub struct LinkingRequest {
    pub domain: Domain,
    pub messages: Vec<Message>,
    pub system_prompt: Option<SystemPrompt>,
    pub request_id: RequestId,
    /// Reference timestamp, unix milliseconds. `None` means "resolve from
    /// the injected clock once, at call entry" — see `Linker::link`'s doc
    /// comment for the explicit wall-clock-vs-injected-clock contract.
    pub timestamp: Option<i64>,
}

impl LinkingRequest {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// Output of `Linker::link` (§3/§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkResult {
    pub conversation_id: Option<ConversationId>,
    pub parent_request_id: Option<RequestId>,
    pub branch_id: BranchId,
    pub current_message_hash: MessageHash,
    pub parent_message_hash: Option<MessageHash>,
    pub system_hash: Option<SystemHash>,
    pub is_subtask: Option<bool>,
    pub parent_task_request_id: Option<RequestId>,
    pub subtask_sequence: Option<u32>,
}

impl LinkResult {
    /// Construct the "fresh conversation root" result (§4.8 step 6 / I5).
    pub fn new_root(current_message_hash: MessageHash, parent_message_hash: Option<MessageHash>, system_hash: Option<SystemHash>) -> Self {
        Self {
            conversation_id: None,
            parent_request_id: None,
            branch_id: BranchId::main(),
            current_message_hash,
            parent_message_hash,
            system_hash,
            is_subtask: None,
            parent_task_request_id: None,
            subtask_sequence: None,
        }
    }
}
