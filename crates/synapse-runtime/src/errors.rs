//! Runtime error types.

use thiserror::Error;

/// Errors raised by the orchestrator and executor.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The model referenced a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] synapse_store::StoreError),

    /// Provider failure.
    #[error(transparent)]
    Llm(#[from] synapse_llm::LlmError),

    /// Tool registry or construction failure.
    #[error(transparent)]
    Tool(#[from] synapse_tools::ToolError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;
