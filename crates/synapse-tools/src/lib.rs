//! # synapse-tools
//!
//! Tool trait, registry, and built-in tools for the Synapse agent.
//!
//! - **[`traits`]**: the [`SynapseTool`] trait, execution context, and the
//!   [`ContextVariables`] dependency container tools are constructed from
//! - **[`registry`]**: name → descriptor index with fail-fast instantiation
//!   and concurrent health probing
//! - **[`schema`]**: fluent builder for tool JSON Schema definitions
//! - **[`validation`]**: typed parameter extraction helpers
//! - **[`calculator`]**: dependency-free arithmetic tool
//!
//! ## Crate Position
//!
//! Depends on: synapse-core. Depended on by: synapse-runtime.

#![deny(unsafe_code)]

pub mod calculator;
pub mod errors;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod validation;

pub use errors::ToolError;
pub use registry::{HealthReport, ToolRegistry};
pub use schema::ToolSchemaBuilder;
pub use traits::{ContextVariables, HealthStatus, SynapseTool, ToolDescriptor, ToolInvocation};
