//! Error types for the persistence layer.

use thiserror::Error;

/// Errors raised by the store and repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool failure.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Payload (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Referenced thread does not exist.
    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    /// Referenced message does not exist.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// Invariant violation or lock poisoning.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
