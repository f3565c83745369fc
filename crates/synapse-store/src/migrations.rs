//! Versioned schema migrations.
//!
//! Tracked via `PRAGMA user_version`. Each entry in [`MIGRATIONS`] is one
//! version step and runs in its own transaction.
//!
//! The `messages_fts` FTS5 index is maintained by triggers on `messages`,
//! so the search index changes inside the same transaction as the row —
//! readers never observe an indexed-but-missing (or missing-but-indexed)
//! message.

use rusqlite::Connection;

use crate::errors::Result;

/// Ordered migration steps. `user_version` after running equals the length.
const MIGRATIONS: &[&str] = &[
    // v1 — initial schema
    "
    CREATE TABLE threads (
        id              TEXT PRIMARY KEY,
        user_id         TEXT NOT NULL,
        project_id      TEXT,
        virtual_lab_id  TEXT,
        title           TEXT NOT NULL,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    );
    CREATE INDEX idx_threads_user ON threads (user_id, updated_at DESC);

    CREATE TABLE messages (
        id          TEXT PRIMARY KEY,
        thread_id   TEXT NOT NULL REFERENCES threads (id) ON DELETE CASCADE,
        entity      TEXT NOT NULL CHECK (entity IN ('user', 'ai_message', 'ai_tool', 'tool')),
        content     TEXT NOT NULL,
        is_complete INTEGER NOT NULL DEFAULT 1,
        created_at  TEXT NOT NULL
    );
    CREATE INDEX idx_messages_thread ON messages (thread_id, created_at, id);

    CREATE TABLE tool_calls (
        id          TEXT PRIMARY KEY,
        message_id  TEXT NOT NULL REFERENCES messages (id) ON DELETE CASCADE,
        name        TEXT NOT NULL,
        arguments   TEXT NOT NULL,
        validated   TEXT CHECK (validated IN ('pending', 'accepted', 'rejected'))
    );
    CREATE INDEX idx_tool_calls_message ON tool_calls (message_id);

    CREATE TABLE token_consumption (
        id          TEXT PRIMARY KEY,
        message_id  TEXT NOT NULL REFERENCES messages (id) ON DELETE CASCADE,
        token_type  TEXT NOT NULL
                    CHECK (token_type IN ('input_noncached', 'input_cached', 'completion')),
        count       INTEGER NOT NULL CHECK (count >= 0),
        task        TEXT NOT NULL,
        model       TEXT NOT NULL
    );
    CREATE INDEX idx_token_consumption_message ON token_consumption (message_id);

    CREATE TABLE tool_selections (
        id              TEXT PRIMARY KEY,
        message_id      TEXT NOT NULL REFERENCES messages (id) ON DELETE CASCADE,
        selected_tools  TEXT NOT NULL
    );

    CREATE TABLE complexity_estimations (
        id              TEXT PRIMARY KEY,
        message_id      TEXT NOT NULL REFERENCES messages (id) ON DELETE CASCADE,
        complexity      INTEGER NOT NULL,
        justification   TEXT
    );

    CREATE VIRTUAL TABLE messages_fts USING fts5(
        id UNINDEXED,
        thread_id UNINDEXED,
        entity UNINDEXED,
        content,
        tokenize = 'porter unicode61'
    );

    CREATE TRIGGER messages_fts_insert AFTER INSERT ON messages BEGIN
        INSERT INTO messages_fts (id, thread_id, entity, content)
        VALUES (
            new.id, new.thread_id, new.entity,
            coalesce(json_extract(new.content, '$.text'), '')
        );
    END;

    CREATE TRIGGER messages_fts_delete AFTER DELETE ON messages BEGIN
        DELETE FROM messages_fts WHERE id = old.id;
    END;

    CREATE TRIGGER messages_fts_update AFTER UPDATE OF content ON messages BEGIN
        DELETE FROM messages_fts WHERE id = old.id;
        INSERT INTO messages_fts (id, thread_id, entity, content)
        VALUES (
            new.id, new.thread_id, new.entity,
            coalesce(json_extract(new.content, '$.text'), '')
        );
    END;
    ",
];

/// Run all pending migrations. Returns the number of steps applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    let current: usize =
        conn.query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))? as usize;

    let mut applied = 0;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", index as i64 + 1)?;
        tx.commit()?;
        applied += 1;
    }
    Ok(applied)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
