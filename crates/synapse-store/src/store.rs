//! High-level transactional `ChatStore` API.
//!
//! Composes the repositories into atomic, thread-centric methods. Every
//! write method runs inside a single SQLite transaction — callers never
//! observe a message without its expected children.

use serde_json::{json, Value};
use tracing::{debug, instrument};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use synapse_core::ids::{new_message_id, new_thread_id, now_rfc3339};
use uuid::Uuid;
use synapse_core::messages::{ToolCallRequest, UsageReport, UsageTotals};

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::{Result, StoreError};
use crate::repositories::search::SearchOptions;
use crate::repositories::{MessageRepo, SearchRepo, ThreadRepo};
use crate::row_types::{
    MessageEntity, MessageRecord, MessageRow, SearchHit, ThreadRow, ToolCallRow,
};
use crate::tokens::consumption_rows;

/// Options for creating a thread.
#[derive(Debug, Default)]
pub struct CreateThreadOptions<'a> {
    /// Owning user.
    pub user_id: &'a str,
    /// Optional project scope.
    pub project_id: Option<&'a str>,
    /// Optional virtual-lab scope.
    pub virtual_lab_id: Option<&'a str>,
    /// Title; defaults to "New chat" when absent.
    pub title: Option<&'a str>,
}

/// One assistant turn to persist atomically.
///
/// When `tool_calls` is non-empty the message is stored as `ai_tool` with
/// one child row per call; otherwise as `ai_message`. Token rows derived
/// from `usage` and any telemetry land in the same transaction.
pub struct AssistantTurn<'a> {
    /// Thread to append to.
    pub thread_id: &'a str,
    /// Assistant text (preamble text for tool-call turns).
    pub text: Option<&'a str>,
    /// Tool calls the model requested this turn.
    pub tool_calls: &'a [ToolCallRequest],
    /// Provider usage report, when the provider sent one.
    pub usage: Option<&'a UsageReport>,
    /// Model identifier stamped on token rows.
    pub model: &'a str,
    /// Tools the router offered this turn, when tool routing ran.
    pub selected_tools: Option<&'a [String]>,
    /// Complexity estimate for the turn, when one was produced.
    pub complexity: Option<(i64, Option<&'a str>)>,
}

/// One tool result to persist as a `tool` message.
#[derive(Clone, Debug)]
pub struct ToolResultRecord {
    /// Originating tool-call id.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Tool output (JSON).
    pub output: Value,
    /// Whether the tool reported failure.
    pub is_error: bool,
}

/// Task tag stamped on token rows written by chat turns.
const CHAT_TASK: &str = "chat_completion";

/// High-level store wrapping a connection pool and the repositories.
///
/// INVARIANT: thread writes are serialized per-thread via in-process mutex
/// locks (`with_thread_write_lock`). Global mutations (thread creation,
/// deletion) use a separate global lock.
pub struct ChatStore {
    pool: ConnectionPool,
    global_write_lock: Mutex<()>,
    thread_write_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl ChatStore {
    const SQLITE_BUSY_MAX_RETRIES: u32 = 32;

    /// Create a new store over the given connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            global_write_lock: Mutex::new(()),
            thread_write_locks: Mutex::new(HashMap::new()),
        }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn lock_global_write(&self) -> Result<MutexGuard<'_, ()>> {
        self.global_write_lock
            .lock()
            .map_err(|_| StoreError::Internal("global write lock poisoned".into()))
    }

    fn acquire_thread_write_lock(&self, thread_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .thread_write_locks
            .lock()
            .map_err(|_| StoreError::Internal("thread lock map poisoned".into()))?;

        // Opportunistically prune dead weak refs when the map grows.
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(thread_id).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(thread_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn with_thread_write_lock<T>(
        &self,
        thread_id: &str,
        f: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let thread_lock = self.acquire_thread_write_lock(thread_id)?;
        let _guard = thread_lock
            .lock()
            .map_err(|_| StoreError::Internal("thread write lock poisoned".into()))?;
        self.retry_on_sqlite_busy(f)
    }

    fn with_global_write_lock<T>(&self, f: impl FnMut() -> Result<T>) -> Result<T> {
        let _guard = self.lock_global_write()?;
        self.retry_on_sqlite_busy(f)
    }

    /// Retry an operation on SQLite BUSY/LOCKED with linear backoff + jitter.
    ///
    /// Backoff: base = min(attempts * 10, 500) ms, jitter ±25% to prevent
    /// thundering herd when multiple writers contend on the same database.
    #[allow(clippy::unused_self)]
    fn retry_on_sqlite_busy<T>(&self, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err)
                    if Self::is_sqlite_busy_or_locked(&err)
                        && attempts < Self::SQLITE_BUSY_MAX_RETRIES =>
                {
                    attempts += 1;
                    let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn is_sqlite_busy_or_locked(err: &StoreError) -> bool {
        match err {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Thread lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a new thread.
    #[instrument(skip(self, opts), fields(user_id = opts.user_id))]
    pub fn create_thread(&self, opts: &CreateThreadOptions<'_>) -> Result<ThreadRow> {
        self.with_global_write_lock(|| {
            let now = now_rfc3339();
            let thread = ThreadRow {
                id: new_thread_id(),
                user_id: opts.user_id.to_string(),
                project_id: opts.project_id.map(str::to_string),
                virtual_lab_id: opts.virtual_lab_id.map(str::to_string),
                title: opts.title.unwrap_or("New chat").to_string(),
                created_at: now.clone(),
                updated_at: now,
            };
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            ThreadRepo::create(&tx, &thread)?;
            tx.commit()?;
            debug!(thread_id = %thread.id, "thread created");
            Ok(thread)
        })
    }

    /// Fetch a thread by id.
    pub fn get_thread(&self, thread_id: &str) -> Result<Option<ThreadRow>> {
        let conn = self.conn()?;
        ThreadRepo::get_by_id(&conn, thread_id)
    }

    /// List a user's threads, most recently active first.
    pub fn list_threads(&self, user_id: &str) -> Result<Vec<ThreadRow>> {
        let conn = self.conn()?;
        ThreadRepo::list_by_user(&conn, user_id)
    }

    /// Rename a thread.
    pub fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()> {
        self.with_thread_write_lock(thread_id, || {
            let conn = self.conn()?;
            if !ThreadRepo::update_title(&conn, thread_id, title, &now_rfc3339())? {
                return Err(StoreError::ThreadNotFound(thread_id.to_string()));
            }
            Ok(())
        })
    }

    /// Delete a thread and everything under it.
    #[instrument(skip(self))]
    pub fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let deleted = self.with_global_write_lock(|| {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            let deleted = ThreadRepo::delete(&tx, thread_id)?;
            tx.commit()?;
            Ok(deleted)
        })?;
        if deleted {
            let mut locks = self
                .thread_write_locks
                .lock()
                .map_err(|_| StoreError::Internal("thread lock map poisoned".into()))?;
            let _ = locks.remove(thread_id);
        }
        Ok(deleted)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Message writes
    // ─────────────────────────────────────────────────────────────────────

    /// Append a user message to a thread.
    #[instrument(skip(self, text))]
    pub fn append_user_message(&self, thread_id: &str, text: &str) -> Result<MessageRow> {
        self.with_thread_write_lock(thread_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            Self::require_thread(&tx, thread_id)?;

            let now = now_rfc3339();
            let message = MessageRow {
                id: new_message_id(),
                thread_id: thread_id.to_string(),
                entity: MessageEntity::User,
                content: json!({ "text": text }),
                is_complete: true,
                created_at: now.clone(),
            };
            MessageRepo::insert(&tx, &message)?;
            let _ = ThreadRepo::touch(&tx, thread_id, &now)?;
            tx.commit()?;
            Ok(message)
        })
    }

    /// Persist one assistant turn atomically: the message row, child
    /// tool-call rows, token consumption rows, and any telemetry.
    #[instrument(skip(self, turn), fields(thread_id = turn.thread_id))]
    pub fn persist_assistant_turn(&self, turn: &AssistantTurn<'_>) -> Result<MessageRow> {
        self.with_thread_write_lock(turn.thread_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            Self::require_thread(&tx, turn.thread_id)?;

            let entity = if turn.tool_calls.is_empty() {
                MessageEntity::AiMessage
            } else {
                MessageEntity::AiTool
            };
            let now = now_rfc3339();
            let message = MessageRow {
                id: new_message_id(),
                thread_id: turn.thread_id.to_string(),
                entity,
                content: json!({ "text": turn.text.unwrap_or("") }),
                is_complete: true,
                created_at: now.clone(),
            };
            MessageRepo::insert(&tx, &message)?;

            for call in turn.tool_calls {
                MessageRepo::insert_tool_call(
                    &tx,
                    &ToolCallRow {
                        id: call.id.clone(),
                        message_id: message.id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                        validated: None,
                    },
                )?;
            }
            for row in consumption_rows(&message.id, turn.model, CHAT_TASK, turn.usage) {
                MessageRepo::insert_token_consumption(&tx, &row)?;
            }
            if let Some(selected) = turn.selected_tools {
                let id = format!("sel_{}", Uuid::now_v7());
                MessageRepo::insert_tool_selection(&tx, &id, &message.id, selected)?;
            }
            if let Some((complexity, justification)) = turn.complexity {
                let id = format!("cx_{}", Uuid::now_v7());
                MessageRepo::insert_complexity_estimation(
                    &tx,
                    &id,
                    &message.id,
                    complexity,
                    justification,
                )?;
            }

            let _ = ThreadRepo::touch(&tx, turn.thread_id, &now)?;
            tx.commit()?;
            debug!(message_id = %message.id, entity = entity.as_str(), "assistant turn persisted");
            Ok(message)
        })
    }

    /// Persist a batch of tool results as `tool` messages in one transaction.
    #[instrument(skip(self, results), fields(count = results.len()))]
    pub fn persist_tool_results(
        &self,
        thread_id: &str,
        results: &[ToolResultRecord],
    ) -> Result<Vec<MessageRow>> {
        self.with_thread_write_lock(thread_id, || {
            let conn = self.conn()?;
            let tx = conn.unchecked_transaction()?;
            Self::require_thread(&tx, thread_id)?;

            let now = now_rfc3339();
            let mut messages = Vec::with_capacity(results.len());
            for result in results {
                let message = MessageRow {
                    id: new_message_id(),
                    thread_id: thread_id.to_string(),
                    entity: MessageEntity::Tool,
                    content: json!({
                        "toolCallId": result.tool_call_id,
                        "toolName": result.tool_name,
                        "output": result.output,
                        "isError": result.is_error,
                    }),
                    is_complete: true,
                    created_at: now.clone(),
                };
                MessageRepo::insert(&tx, &message)?;
                messages.push(message);
            }
            let _ = ThreadRepo::touch(&tx, thread_id, &now)?;
            tx.commit()?;
            Ok(messages)
        })
    }

    fn require_thread(conn: &rusqlite::Connection, thread_id: &str) -> Result<()> {
        if ThreadRepo::exists(conn, thread_id)? {
            Ok(())
        } else {
            Err(StoreError::ThreadNotFound(thread_id.to_string()))
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Load a thread's full history with tool calls attached.
    pub fn history(&self, thread_id: &str) -> Result<Vec<MessageRecord>> {
        let conn = self.conn()?;
        Self::require_thread(&conn, thread_id)?;
        MessageRepo::list_with_tool_calls(&conn, thread_id)
    }

    /// Full-text search over message content.
    pub fn search(&self, query: &str, opts: &SearchOptions<'_>) -> Result<Vec<SearchHit>> {
        let conn = self.conn()?;
        SearchRepo::search(&conn, query, opts)
    }

    /// Aggregate token usage for a thread.
    pub fn usage_totals(&self, thread_id: &str) -> Result<UsageTotals> {
        let conn = self.conn()?;
        MessageRepo::usage_totals(&conn, thread_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
