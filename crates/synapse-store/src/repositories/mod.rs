//! Stateless per-table repositories.
//!
//! Each repository is a unit struct with associated functions taking
//! `&Connection`, so the caller decides transaction boundaries.
//! [`crate::store::ChatStore`] composes them into transactional operations.

pub mod message;
pub mod search;
pub mod thread;

pub use message::MessageRepo;
pub use search::SearchRepo;
pub use thread::ThreadRepo;
