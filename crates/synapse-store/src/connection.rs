//! Connection pooling for SQLite.
//!
//! Every connection runs WAL, enforces foreign keys (cascade deletes depend
//! on it), and carries a busy timeout so short write contention resolves
//! inside SQLite before our own retry layer kicks in.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use uuid::Uuid;

use crate::errors::Result;

/// Pool of SQLite connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;
/// A checked-out connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool sizing configuration.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionConfig {
    /// Maximum pooled connections.
    pub max_size: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { max_size: 8 }
    }
}

fn init_pragmas(conn: &mut rusqlite::Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
}

/// Open a pool on a database file.
pub fn new_pool(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path).with_init(init_pragmas);
    Ok(r2d2::Pool::builder()
        .max_size(config.max_size)
        .build(manager)?)
}

/// Open a pool on a private in-memory database.
///
/// Uses a uniquely named shared-cache memory database so every pooled
/// connection sees the same data; the database lives as long as the pool.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    let uri = format!("file:memdb_{}?mode=memory&cache=shared", Uuid::now_v7().simple());
    let manager = SqliteConnectionManager::file(uri)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_init(init_pragmas);
    Ok(r2d2::Pool::builder()
        .max_size(config.max_size)
        .build(manager)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
