//! # synapse-store
//!
//! SQLite persistence for the Synapse agent.
//!
//! - **Connection**: r2d2 pool over rusqlite with WAL + foreign keys
//! - **Migrations**: versioned schema (threads, messages, tool_calls,
//!   token_consumption, telemetry, FTS5 search index + triggers)
//! - **Repositories**: stateless per-table CRUD taking `&Connection`
//! - **[`store::ChatStore`]**: transactional, thread-centric API — every
//!   write runs in a single transaction, callers never see partial state
//! - **[`tokens`]**: provider usage report → token consumption rows
//!
//! ## Crate Position
//!
//! Depends on: synapse-core. Depended on by: synapse-runtime.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod row_types;
pub mod store;
pub mod tokens;

pub use connection::{ConnectionConfig, ConnectionPool, new_in_memory, new_pool};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use store::{AssistantTurn, ChatStore, CreateThreadOptions, ToolResultRecord};
