//! Error types for the SQLite backend.

use thiserror::Error;

/// Errors that can occur while opening or seeding a store.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
