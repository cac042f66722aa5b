//! Store capability trait, compact-continuation detector, sub-task matcher,
//! parent resolver, branch allocator, and the orchestrator that ties them
//! together into `Linker::link`. Everything here is I/O-aware; the pure data
//! model, normalizer, and hasher it depends on live in `convlink-core`.

pub mod branch;
pub mod compact;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod subtask;

pub use branch::allocate_branch;
pub use compact::{try_compact_link, CompactMatch};
pub use orchestrator::Linker;
pub use resolver::{looks_like_summarization_prompt, resolve_parent};
pub use convlink_core::StoreError;
pub use store::{FindParentsCriteria, StoreClient, SystemHashCriterion};
pub use subtask::{try_subtask_link, SubtaskMatch};
