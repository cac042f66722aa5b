//! Data model, content normalizer, hasher, reminder stripper, injected clock
//! and configuration for the conversation linking core. No I/O lives here —
//! everything that talks to a persistence layer lives in `convlink-linker`.

pub mod clock;
pub mod config;
pub mod error;
pub mod hash;
pub mod model;
pub mod normalize;
pub mod reminder;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LinkerConfig;
pub use error::{LinkError, StoreError};
pub use hash::{hash_messages, hash_system};
pub use model::{
    BranchId, Content, ContentPart, ConversationId, Domain, Hash, LinkResult, LinkingRequest,
    Message, MessageHash, RequestId, Role, StoredRequest, StoredRequestSummary, SystemHash,
    SystemPrompt, SystemPromptPart, TaskInvocation, TaskToolCall,
};
pub use reminder::{contains_reminder, strip_reminders};
