//! Prefixed UUIDv7 ID generators.
//!
//! Every persisted entity gets a time-ordered v7 UUID with a short type
//! prefix, so an ID is self-describing in logs and queries.

use uuid::Uuid;

/// New thread ID (`thr_…`).
pub fn new_thread_id() -> String {
    format!("thr_{}", Uuid::now_v7())
}

/// New message ID (`msg_…`).
pub fn new_message_id() -> String {
    format!("msg_{}", Uuid::now_v7())
}

/// New token consumption record ID (`tok_…`).
pub fn new_token_record_id() -> String {
    format!("tok_{}", Uuid::now_v7())
}

/// Current UTC timestamp as RFC 3339.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
