//! Full-text search over message content.
//!
//! The `messages_fts` table is auto-populated by triggers on the `messages`
//! table, so it is always consistent with committed rows. This repository
//! provides BM25-ranked search, filtering, and index maintenance.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::Result;
use crate::row_types::{MessageEntity, SearchHit};

/// Options for search queries.
#[derive(Default)]
pub struct SearchOptions<'a> {
    /// Restrict to one thread.
    pub thread_id: Option<&'a str>,
    /// Restrict to these entity kinds.
    pub entities: Option<&'a [MessageEntity]>,
    /// Maximum results.
    pub limit: Option<i64>,
    /// Skip results.
    pub offset: Option<i64>,
}

/// Search repository — stateless, every method takes `&Connection`.
pub struct SearchRepo;

impl SearchRepo {
    /// Full-text search with BM25 ranking and optional filters.
    ///
    /// The `query` parameter uses FTS5 syntax (e.g. `"action potential"`,
    /// `neuron OR synapse`). Results are ordered best match first.
    pub fn search(
        conn: &Connection,
        query: &str,
        opts: &SearchOptions<'_>,
    ) -> Result<Vec<SearchHit>> {
        use std::fmt::Write;
        let mut sql = String::from(
            "SELECT
               messages_fts.id,
               messages_fts.thread_id,
               messages_fts.entity,
               snippet(messages_fts, 3, '<mark>', '</mark>', '...', 64) as snippet,
               bm25(messages_fts) as score
             FROM messages_fts
             WHERE messages_fts MATCH ?1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        param_values.push(Box::new(query.to_string()));

        if let Some(thread_id) = opts.thread_id {
            let _ = write!(
                sql,
                " AND messages_fts.thread_id = ?{}",
                param_values.len() + 1
            );
            param_values.push(Box::new(thread_id.to_string()));
        }
        if let Some(entities) = opts.entities {
            if !entities.is_empty() {
                let placeholders: Vec<String> = entities
                    .iter()
                    .enumerate()
                    .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
                    .collect();
                let _ = write!(
                    sql,
                    " AND messages_fts.entity IN ({})",
                    placeholders.join(", ")
                );
                for entity in entities {
                    param_values.push(Box::new(entity.as_str().to_string()));
                }
            }
        }

        sql.push_str(" ORDER BY score");

        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }
        if let Some(offset) = opts.offset {
            let _ = write!(sql, " OFFSET {offset}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_search_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Search within a specific thread.
    pub fn search_in_thread(
        conn: &Connection,
        thread_id: &str,
        query: &str,
        limit: Option<i64>,
    ) -> Result<Vec<SearchHit>> {
        Self::search(
            conn,
            query,
            &SearchOptions {
                thread_id: Some(thread_id),
                limit,
                ..Default::default()
            },
        )
    }

    /// Check if a message is indexed.
    pub fn is_indexed(conn: &Connection, message_id: &str) -> Result<bool> {
        let found: Option<String> = conn
            .query_row(
                "SELECT id FROM messages_fts WHERE id = ?1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Count indexed messages for a thread.
    pub fn count_by_thread(conn: &Connection, thread_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages_fts WHERE thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Rebuild the FTS index for a thread from the messages table.
    ///
    /// Deletes all existing index entries for the thread, then re-indexes
    /// each message using the same text extraction as the triggers.
    /// Returns the number of messages re-indexed.
    pub fn rebuild_thread_index(conn: &Connection, thread_id: &str) -> Result<usize> {
        let _ = conn.execute(
            "DELETE FROM messages_fts WHERE thread_id = ?1",
            params![thread_id],
        )?;

        let changed = conn.execute(
            "INSERT INTO messages_fts (id, thread_id, entity, content)
             SELECT id, thread_id, entity, coalesce(json_extract(content, '$.text'), '')
             FROM messages WHERE thread_id = ?1 ORDER BY created_at, id",
            params![thread_id],
        )?;
        Ok(changed)
    }

    fn map_search_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchHit> {
        let entity_text: String = row.get(2)?;
        let entity = MessageEntity::parse(&entity_text).unwrap_or(MessageEntity::User);
        Ok(SearchHit {
            message_id: row.get(0)?,
            thread_id: row.get(1)?,
            entity,
            snippet: row.get(3)?,
            score: row.get(4)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::repositories::{MessageRepo, ThreadRepo};
    use crate::row_types::{MessageRow, ThreadRow};
    use serde_json::json;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        let _ = run_migrations(&conn).unwrap();
        for thread_id in ["thr_1", "thr_2"] {
            ThreadRepo::create(
                &conn,
                &ThreadRow {
                    id: thread_id.to_string(),
                    user_id: "u1".to_string(),
                    project_id: None,
                    virtual_lab_id: None,
                    title: "t".to_string(),
                    created_at: "2026-01-01T00:00:00Z".to_string(),
                    updated_at: "2026-01-01T00:00:00Z".to_string(),
                },
            )
            .unwrap();
        }
        conn
    }

    fn insert_text(conn: &Connection, id: &str, thread_id: &str, entity: MessageEntity, text: &str) {
        MessageRepo::insert(
            conn,
            &MessageRow {
                id: id.to_string(),
                thread_id: thread_id.to_string(),
                entity,
                content: json!({ "text": text }),
                is_complete: true,
                created_at: format!("2026-01-01T00:00:0{}Z", id.len() % 10),
            },
        )
        .unwrap();
    }

    #[test]
    fn search_ranks_and_snippets() {
        let conn = setup();
        insert_text(
            &conn,
            "msg_1",
            "thr_1",
            MessageEntity::User,
            "tell me about the hippocampus",
        );
        insert_text(
            &conn,
            "msg_2",
            "thr_1",
            MessageEntity::AiMessage,
            "the hippocampus is involved in memory; hippocampus lesions impair recall",
        );
        insert_text(&conn, "msg_3", "thr_1", MessageEntity::AiMessage, "unrelated");

        let hits = SearchRepo::search(&conn, "hippocampus", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].snippet.contains("<mark>"));
        // Best match (lowest bm25 score) first.
        assert!(hits[0].score <= hits[1].score);
    }

    #[test]
    fn thread_filter_scopes_results() {
        let conn = setup();
        insert_text(&conn, "msg_1", "thr_1", MessageEntity::User, "dopamine pathways");
        insert_text(&conn, "msg_2", "thr_2", MessageEntity::User, "dopamine receptors");

        let hits = SearchRepo::search_in_thread(&conn, "thr_1", "dopamine", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].thread_id, "thr_1");
    }

    #[test]
    fn entity_filter_scopes_results() {
        let conn = setup();
        insert_text(&conn, "msg_1", "thr_1", MessageEntity::User, "cortex question");
        insert_text(&conn, "msg_2", "thr_1", MessageEntity::AiMessage, "cortex answer");

        let hits = SearchRepo::search(
            &conn,
            "cortex",
            &SearchOptions {
                entities: Some(&[MessageEntity::AiMessage]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, MessageEntity::AiMessage);
    }

    #[test]
    fn limit_and_offset_page_results() {
        let conn = setup();
        for i in 0..5 {
            insert_text(
                &conn,
                &format!("msg_{i}"),
                "thr_1",
                MessageEntity::AiMessage,
                "synapse plasticity",
            );
        }
        let page = SearchRepo::search(
            &conn,
            "plasticity",
            &SearchOptions {
                limit: Some(2),
                offset: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn rebuild_restores_dropped_index() {
        let conn = setup();
        insert_text(&conn, "msg_1", "thr_1", MessageEntity::User, "astrocyte function");
        assert!(SearchRepo::is_indexed(&conn, "msg_1").unwrap());

        let _ = conn
            .execute("DELETE FROM messages_fts WHERE id = 'msg_1'", [])
            .unwrap();
        assert!(!SearchRepo::is_indexed(&conn, "msg_1").unwrap());

        let reindexed = SearchRepo::rebuild_thread_index(&conn, "thr_1").unwrap();
        assert_eq!(reindexed, 1);
        assert_eq!(SearchRepo::count_by_thread(&conn, "thr_1").unwrap(), 1);
        let hits = SearchRepo::search_in_thread(&conn, "thr_1", "astrocyte", None).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
