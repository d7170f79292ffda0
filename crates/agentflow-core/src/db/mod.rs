//! SQLite database layer for the agent catalog and workflow store.
//!
//! Uses rusqlite with WAL mode for file-backed databases.
//! All database operations from async code go through
//! `tokio::task::spawn_blocking` to avoid blocking the runtime.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::FlowError;

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    ///
    /// `":memory:"` opens an in-memory database.
    pub fn open(db_path: &str) -> Result<Self, FlowError> {
        if db_path == ":memory:" {
            return Self::open_in_memory();
        }

        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .map_err(|e| FlowError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| FlowError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, FlowError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FlowError::Database(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| FlowError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, FlowError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| FlowError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| FlowError::Database(e.to_string()))
    }

    /// Execute a closure that needs a mutable connection (transactions).
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, FlowError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| FlowError::Database(format!("Lock poisoned: {}", e)))?;
        f(&mut conn).map_err(|e| FlowError::Database(e.to_string()))
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, FlowError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| FlowError::Database(format!("Task join error: {}", e)))?
    }

    /// Async variant of [`Database::with_conn_mut`].
    pub async fn with_conn_mut_async<F, T>(&self, f: F) -> Result<T, FlowError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn_mut(f))
            .await
            .map_err(|e| FlowError::Database(format!("Task join error: {}", e)))?
    }

    /// Create all tables if they don't exist.
    fn initialize_tables(&self) -> Result<(), FlowError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS agents (
                    id              INTEGER PRIMARY KEY,
                    name            TEXT NOT NULL UNIQUE,
                    description     TEXT NOT NULL DEFAULT '',
                    category        TEXT NOT NULL DEFAULT 'general',
                    kind            TEXT NOT NULL,
                    input_schema    TEXT NOT NULL DEFAULT '{}',
                    output_schema   TEXT NOT NULL DEFAULT '{}',
                    config_schema   TEXT NOT NULL DEFAULT '{}',
                    created_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_agents_category ON agents(category);

                CREATE TABLE IF NOT EXISTS workflows (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    name            TEXT NOT NULL,
                    description     TEXT NOT NULL DEFAULT '',
                    category        TEXT,
                    is_template     INTEGER NOT NULL DEFAULT 0,
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS workflow_steps (
                    id              INTEGER PRIMARY KEY AUTOINCREMENT,
                    workflow_id     INTEGER NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
                    agent_id        INTEGER NOT NULL REFERENCES agents(id),
                    step_order      INTEGER NOT NULL DEFAULT 0,
                    config          TEXT NOT NULL DEFAULT '{}'
                );
                CREATE INDEX IF NOT EXISTS idx_workflow_steps_workflow ON workflow_steps(workflow_id);
                ",
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_creates_tables() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                     AND name IN ('agents', 'workflows', 'workflow_steps')",
                    [],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agentflow.db");
        let db = Database::open(path.to_str().unwrap()).unwrap();
        let one: i64 = db
            .with_conn(|conn| conn.query_row("SELECT 1", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(one, 1);
        assert!(path.exists());
    }
}
