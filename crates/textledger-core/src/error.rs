//! Error types for the core library.

use thiserror::Error;

use crate::filter::InvalidFilterError;
use crate::store::StoreUnavailableError;

/// Errors that can occur while reading messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw filter request was malformed.
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),

    /// A store query failed; the whole read fails with it.
    #[error(transparent)]
    Store(#[from] StoreUnavailableError),

    /// A source fetch task panicked or was aborted.
    #[error("Fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
