//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Path that selects a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Shared handle to the single connection
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
pub struct DbState {
    conn: SharedConnection,
    path: PathBuf,
}

impl DbState {
    pub fn new(path: PathBuf) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            path,
        }
    }

    /// Connection handle for a repository
    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Close the connection; repositories fail with "Database not initialized" afterwards
    pub async fn close(&self) {
        if let Some(conn) = self.conn.lock().await.take() {
            if let Err((_, e)) = conn.close() {
                log::warn!("Failed to close database {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Open the database at `db_path` (or in memory) and run migrations
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = if db_path == Path::new(IN_MEMORY) {
        Connection::open_in_memory()
    } else {
        Connection::open(db_path)
    }
    .map_err(|e| DomainError::Internal(format!("Failed to open {}: {}", db_path.display(), e)))?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| DomainError::Internal(format!("Failed to enable foreign keys: {}", e)))?;

    run_migrations(&conn)?;

    let state = DbState::new(db_path.to_path_buf());
    *state.conn.lock().await = Some(conn);

    log::info!("Database ready at {}", db_path.display());
    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS todo_lists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS todo_groups (
            id TEXT PRIMARY KEY,
            list_id TEXT NOT NULL REFERENCES todo_lists(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS todo_items (
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL REFERENCES todo_groups(id) ON DELETE CASCADE,
            list_id TEXT NOT NULL REFERENCES todo_lists(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            done INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            completed_at TEXT
        );",
    )
    .map_err(|e| DomainError::Internal(format!("Failed to create tables: {}", e)))?;

    // Added after the first schema; older files lack it
    if !column_exists(conn, "todo_groups", "collapsed")? {
        conn.execute(
            "ALTER TABLE todo_groups ADD COLUMN collapsed INTEGER NOT NULL DEFAULT 0",
            [],
        )
        .map_err(|e| DomainError::Internal(format!("Failed to add collapsed: {}", e)))?;
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_groups_list ON todo_groups(list_id, position);
        CREATE INDEX IF NOT EXISTS idx_items_list ON todo_items(list_id, position);
        CREATE INDEX IF NOT EXISTS idx_items_group ON todo_items(group_id, position);",
    )
    .map_err(|e| DomainError::Internal(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = init_db(Path::new(IN_MEMORY)).await.expect("init");
        assert!(db.is_open().await);

        let conn = db.connection();
        let guard = conn.lock().await;
        let conn = guard.as_ref().unwrap();
        assert!(column_exists(conn, "todo_groups", "collapsed").unwrap());
        assert!(!column_exists(conn, "todo_groups", "missing").unwrap());

        let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
        assert_eq!(fk, 1);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noto.db");

        let first = init_db(&path).await.expect("first open");
        first.close().await;
        assert!(!first.is_open().await);

        let second = init_db(&path).await.expect("second open");
        assert!(second.is_open().await);
        assert_eq!(second.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_adds_collapsed_to_old_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE todo_groups (
                    id TEXT PRIMARY KEY,
                    list_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    position INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );",
            )
            .unwrap();
        }

        let db = init_db(&path).await.expect("migrate");
        let conn = db.connection();
        let guard = conn.lock().await;
        assert!(column_exists(guard.as_ref().unwrap(), "todo_groups", "collapsed").unwrap());
    }
}
