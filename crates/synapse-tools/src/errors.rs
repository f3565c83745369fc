//! Tool error types.

use thiserror::Error;

/// Errors raised by tool construction, lookup, and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A context variable the tool's constructor declared is absent.
    #[error("missing context variable: {variable}")]
    MissingContext {
        /// The absent variable.
        variable: String,
    },

    /// A tool with this name is already registered.
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),

    /// No tool registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Execution was cancelled.
    #[error("cancelled")]
    Cancelled,
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ToolError>;
