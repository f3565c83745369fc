//! Message, tool-call, token, and telemetry persistence.

use rusqlite::{params, Connection, Row};
use serde_json::Value;
use synapse_core::messages::UsageTotals;

use crate::errors::Result;
use crate::row_types::{
    MessageEntity, MessageRecord, MessageRow, TokenConsumptionRow, ToolCallRow,
};

/// Repository for `messages` and its child tables.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message row. Content is stored as canonical JSON text.
    pub fn insert(conn: &Connection, message: &MessageRow) -> Result<()> {
        let content = serde_json::to_string(&message.content)?;
        let _ = conn.execute(
            "INSERT INTO messages (id, thread_id, entity, content, is_complete, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.thread_id,
                message.entity.as_str(),
                content,
                message.is_complete,
                message.created_at,
            ],
        )?;
        Ok(())
    }

    /// Insert a tool call under an `ai_tool` message.
    pub fn insert_tool_call(conn: &Connection, call: &ToolCallRow) -> Result<()> {
        let arguments = serde_json::to_string(&call.arguments)?;
        let _ = conn.execute(
            "INSERT INTO tool_calls (id, message_id, name, arguments, validated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![call.id, call.message_id, call.name, arguments, call.validated],
        )?;
        Ok(())
    }

    /// Insert one token consumption row.
    pub fn insert_token_consumption(conn: &Connection, row: &TokenConsumptionRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO token_consumption (id, message_id, token_type, count, task, model)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.message_id,
                row.token_type.as_str(),
                row.count as i64,
                row.task,
                row.model,
            ],
        )?;
        Ok(())
    }

    /// Record which tools the router offered for a turn.
    pub fn insert_tool_selection(
        conn: &Connection,
        id: &str,
        message_id: &str,
        selected_tools: &[String],
    ) -> Result<()> {
        let selected = serde_json::to_string(selected_tools)?;
        let _ = conn.execute(
            "INSERT INTO tool_selections (id, message_id, selected_tools) VALUES (?1, ?2, ?3)",
            params![id, message_id, selected],
        )?;
        Ok(())
    }

    /// Record a complexity estimate for a turn.
    pub fn insert_complexity_estimation(
        conn: &Connection,
        id: &str,
        message_id: &str,
        complexity: i64,
        justification: Option<&str>,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO complexity_estimations (id, message_id, complexity, justification)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, message_id, complexity, justification],
        )?;
        Ok(())
    }

    /// List a thread's messages in insertion order.
    ///
    /// Rows whose content fails to parse as JSON are skipped with a warning
    /// rather than failing the whole load.
    pub fn list_by_thread(conn: &Connection, thread_id: &str) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, thread_id, entity, content, is_complete, created_at
             FROM messages WHERE thread_id = ?1 ORDER BY created_at, id",
        )?;
        let mut rows = stmt.query(params![thread_id])?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next()? {
            match Self::map_row(row) {
                Ok(message) => messages.push(message),
                Err(error) => {
                    let id: String = row.get(0).unwrap_or_default();
                    tracing::warn!(message_id = %id, %error, "skipping unreadable message row");
                }
            }
        }
        Ok(messages)
    }

    /// Child tool calls for one message, in insertion order.
    pub fn tool_calls_for_message(conn: &Connection, message_id: &str) -> Result<Vec<ToolCallRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, message_id, name, arguments, validated
             FROM tool_calls WHERE message_id = ?1 ORDER BY rowid",
        )?;
        let mut rows = stmt.query(params![message_id])?;

        let mut calls = Vec::new();
        while let Some(row) = rows.next()? {
            let arguments_text: String = row.get(3)?;
            let arguments = match serde_json::from_str(&arguments_text) {
                Ok(value) => value,
                Err(error) => {
                    let id: String = row.get(0)?;
                    tracing::warn!(tool_call_id = %id, %error, "skipping unreadable tool call row");
                    continue;
                }
            };
            calls.push(ToolCallRow {
                id: row.get(0)?,
                message_id: row.get(1)?,
                name: row.get(2)?,
                arguments,
                validated: row.get(4)?,
            });
        }
        Ok(calls)
    }

    /// List a thread's messages with their tool calls attached.
    pub fn list_with_tool_calls(conn: &Connection, thread_id: &str) -> Result<Vec<MessageRecord>> {
        let messages = Self::list_by_thread(conn, thread_id)?;
        let mut records = Vec::with_capacity(messages.len());
        for message in messages {
            let tool_calls = if message.entity == MessageEntity::AiTool {
                Self::tool_calls_for_message(conn, &message.id)?
            } else {
                Vec::new()
            };
            records.push(MessageRecord { message, tool_calls });
        }
        Ok(records)
    }

    /// Count messages in a thread.
    pub fn count_by_thread(conn: &Connection, thread_id: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count token consumption rows under a thread.
    pub fn count_token_rows_by_thread(conn: &Connection, thread_id: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM token_consumption tc
             JOIN messages m ON m.id = tc.message_id
             WHERE m.thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Aggregate token usage for a whole thread.
    pub fn usage_totals(conn: &Connection, thread_id: &str) -> Result<UsageTotals> {
        let mut stmt = conn.prepare(
            "SELECT tc.token_type, COALESCE(SUM(tc.count), 0)
             FROM token_consumption tc
             JOIN messages m ON m.id = tc.message_id
             WHERE m.thread_id = ?1
             GROUP BY tc.token_type",
        )?;
        let mut rows = stmt.query(params![thread_id])?;

        let mut totals = UsageTotals::default();
        while let Some(row) = rows.next()? {
            let token_type: String = row.get(0)?;
            let sum: i64 = row.get(1)?;
            let sum = sum.max(0) as u64;
            match token_type.as_str() {
                "input_noncached" => totals.input_tokens += sum,
                "input_cached" => totals.cached_input_tokens += sum,
                "completion" => totals.completion_tokens += sum,
                other => {
                    tracing::warn!(token_type = %other, "unknown token type in aggregation");
                }
            }
        }
        Ok(totals)
    }

    fn map_row(row: &Row<'_>) -> Result<MessageRow> {
        let entity_text: String = row.get(2)?;
        let entity = MessageEntity::parse(&entity_text).ok_or_else(|| {
            crate::errors::StoreError::Internal(format!("unknown entity tag: {entity_text}"))
        })?;
        let content_text: String = row.get(3)?;
        let content: Value = serde_json::from_str(&content_text)?;
        Ok(MessageRow {
            id: row.get(0)?,
            thread_id: row.get(1)?,
            entity,
            content,
            is_complete: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
