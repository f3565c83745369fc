//! Error types for LLM provider operations.

use thiserror::Error;

/// Errors raised by provider resolution and streaming.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The resolved provider is unknown or has no configured credentials.
    /// Raised before any network activity.
    #[error("provider not configured: {0}")]
    Configuration(String),

    /// HTTP transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-success status.
    #[error("provider returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated by the caller if needed).
        body: String,
    },

    /// A malformed event arrived on the stream.
    #[error("stream decode error: {0}")]
    Decode(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, LlmError>;
