use thiserror::Error;

/// Errors raised while resolving or hashing a [`crate::model::LinkingRequest`].
///
/// Mirrors the two-layer error pattern used throughout the reference
/// workspace (`SkynetError` wrapping transport errors via `#[from]`): a
/// low-level [`StoreError`] is wrapped by this domain-level error so callers
/// only need to match on one enum.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The request carried zero messages. The only fatal validation error
    /// in the linker — every other stage either short-circuits cleanly or
    /// falls through to "start a new conversation."
    #[error("cannot link a request with zero messages")]
    EmptyMessages,

    /// A store capability call failed or the caller requested cancellation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by a `StoreClient` implementation.
///
/// Defined here (rather than in `convlink-linker`) so that `LinkError` can
/// wrap it without a dependency cycle — the store trait itself lives in
/// `convlink-linker` since it is the I/O-facing half of the system.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or returned a transport-level
    /// failure. The linker performs no retries; this propagates unchanged.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),

    /// The caller's cancellation signal fired before the query completed.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LinkError>;
