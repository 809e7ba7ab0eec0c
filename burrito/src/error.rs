//! Error types for burrito sequences.
//!
//! Every sequence terminates with at most one [`Error`]. Errors are cheap to
//! clone because deferred sources share their single resolution with every
//! subscriber.

use std::sync::Arc;

/// Result type alias for burrito operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A boxed error from user code, shared between subscribers.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error a sequence terminates with.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A deferred source rejected, or user code failed a transform.
    #[error("source rejected: {0}")]
    Rejected(#[source] SharedError),

    /// A plain failure message.
    #[error("{0}")]
    Message(String),

    /// `first` saw upstream complete without a matching element and had no default.
    #[error("no elements in sequence")]
    NoMatch,

    /// A one-shot stream was subscribed to more than once.
    #[error("one-shot stream source has already been consumed")]
    AlreadyConsumed,

    /// `subscribe` could not continue asynchronously outside a tokio runtime.
    #[error("no tokio runtime available to drive the subscription")]
    NoRuntime,
}

impl Error {
    /// Wrap an arbitrary error as a rejection.
    #[must_use]
    pub fn rejected(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Rejected(Arc::from(err.into()))
    }

    /// Create an error from a message.
    #[must_use]
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Returns `true` if this is the "no matching element" error from `first`.
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }
}
