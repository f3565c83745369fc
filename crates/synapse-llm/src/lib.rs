//! # synapse-llm
//!
//! LLM provider abstraction and streaming client.
//!
//! - **[`traits::LlmProvider`]**: async trait producing a `StreamEvent` stream
//! - **[`registry::ProviderRegistry`]**: provider-prefixed model resolution
//!   with credential fail-fast
//! - **[`openai::OpenAiCompatibleProvider`]**: chat-completions SSE client
//! - **[`finish`]**: provider finish-reason mapping
//!
//! ## Crate Position
//!
//! Depends on: synapse-core. Depended on by: synapse-runtime.

#![deny(unsafe_code)]

pub mod errors;
pub mod finish;
pub mod openai;
pub mod registry;
pub mod traits;

pub use errors::{LlmError, Result};
pub use registry::ProviderRegistry;
pub use traits::{ChatRequest, EventStream, LlmProvider};
