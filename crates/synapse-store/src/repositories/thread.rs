//! Thread CRUD.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::Result;
use crate::row_types::ThreadRow;

/// Repository for the `threads` table.
pub struct ThreadRepo;

impl ThreadRepo {
    /// Insert a new thread row.
    pub fn create(conn: &Connection, thread: &ThreadRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO threads (id, user_id, project_id, virtual_lab_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                thread.id,
                thread.user_id,
                thread.project_id,
                thread.virtual_lab_id,
                thread.title,
                thread.created_at,
                thread.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Fetch a thread by ID.
    pub fn get_by_id(conn: &Connection, thread_id: &str) -> Result<Option<ThreadRow>> {
        let row = conn
            .query_row(
                "SELECT id, user_id, project_id, virtual_lab_id, title, created_at, updated_at
                 FROM threads WHERE id = ?1",
                params![thread_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Whether a thread exists.
    pub fn exists(conn: &Connection, thread_id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM threads WHERE id = ?1",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// List a user's threads, most recently updated first.
    pub fn list_by_user(conn: &Connection, user_id: &str) -> Result<Vec<ThreadRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, user_id, project_id, virtual_lab_id, title, created_at, updated_at
             FROM threads WHERE user_id = ?1 ORDER BY updated_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update a thread's title. Returns false when the thread is unknown.
    pub fn update_title(
        conn: &Connection,
        thread_id: &str,
        title: &str,
        updated_at: &str,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE threads SET title = ?2, updated_at = ?3 WHERE id = ?1",
            params![thread_id, title, updated_at],
        )?;
        Ok(changed > 0)
    }

    /// Bump `updated_at`, marking activity on the thread.
    pub fn touch(conn: &Connection, thread_id: &str, updated_at: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE threads SET updated_at = ?2 WHERE id = ?1",
            params![thread_id, updated_at],
        )?;
        Ok(changed > 0)
    }

    /// Delete a thread; children go with it via cascade.
    pub fn delete(conn: &Connection, thread_id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM threads WHERE id = ?1", params![thread_id])?;
        Ok(changed > 0)
    }

    fn map_row(row: &Row<'_>) -> std::result::Result<ThreadRow, rusqlite::Error> {
        Ok(ThreadRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            project_id: row.get(2)?,
            virtual_lab_id: row.get(3)?,
            title: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
