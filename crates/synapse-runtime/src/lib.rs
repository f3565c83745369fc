//! # synapse-runtime
//!
//! The conversation engine: turn loop, tool dispatch, and history codec.
//!
//! - **[`orchestrator`]**: the [`ChatOrchestrator`] turn loop — streams one
//!   conversation run as typed [`AgentEvent`]s while persisting every
//!   completed turn atomically
//! - **[`executor`]**: per-call pipeline (limiter → lookup → instantiate →
//!   execute) with metrics
//! - **[`limiter`]**: per-step parallel tool-call cap with synthetic
//!   retryable rate-limit results
//! - **[`codec`]**: persisted rows ↔ provider-native messages
//!
//! ## Crate Position
//!
//! Depends on: synapse-core, synapse-llm, synapse-store, synapse-tools.
//! Top of the workspace; an embedding server sits above it.
//!
//! [`AgentEvent`]: synapse_core::events::AgentEvent

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod errors;
pub mod executor;
pub mod limiter;
pub mod orchestrator;

pub use config::{AgentConfig, RunOptions};
pub use errors::{Result, RuntimeError};
pub use limiter::StepLimiter;
pub use orchestrator::ChatOrchestrator;
