//! # synapse-core
//!
//! Shared vocabulary for the Synapse conversational agent:
//!
//! - **Messages**: [`messages::ChatMessage`] — the provider-native turn
//!   representation (user, assistant, assistant tool calls, tool result)
//! - **Events**: [`events::StreamEvent`] for LLM streaming,
//!   [`events::AgentEvent`] for the caller-facing output protocol
//! - **Usage**: [`messages::UsageReport`] and [`messages::UsageTotals`]
//! - **Tools**: [`tools::ToolDefinition`] and [`tools::ToolOutput`]
//! - **IDs**: prefixed UUIDv7 generators in [`ids`]
//! - **Logging**: [`logging::init`] tracing setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other synapse crates.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod tools;
