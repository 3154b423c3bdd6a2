//! SQLite-backed storage.
//!
//! Provides persistent storage for:
//! - Reminders (including the durable dispatch marker)
//! - Vital-sign readings
//! - Goal ranges (one per metric kind)
//! - Key-value store for application state

use rusqlite::{params, Connection};

use super::data_dir;
use crate::error::StoreError;

/// SQLite database handle.
///
/// Wrappers like [`super::SqliteReminderStore`] and [`super::MetricsDb`]
/// operate on their own tables through this handle.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/healthpass/healthpass.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(data_dir()?.join("healthpass.db"))
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: impl Into<std::path::PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reminders (
                id                  TEXT PRIMARY KEY,
                title               TEXT NOT NULL,
                description         TEXT NOT NULL DEFAULT '',
                category            TEXT NOT NULL,
                anchor_time         TEXT NOT NULL,
                repeat_rule         TEXT NOT NULL DEFAULT 'none',
                enabled             INTEGER NOT NULL DEFAULT 1,
                completed_at        TEXT,
                last_dispatched_at  TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metrics (
                id          TEXT PRIMARY KEY,
                kind        TEXT NOT NULL,
                value       REAL,
                systolic    REAL,
                diastolic   REAL,
                notes       TEXT,
                recorded_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS goals (
                kind       TEXT PRIMARY KEY,
                payload    TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Create indexes for common query patterns
            CREATE INDEX IF NOT EXISTS idx_reminders_anchor_time ON reminders(anchor_time);
            CREATE INDEX IF NOT EXISTS idx_reminders_enabled_anchor ON reminders(enabled, anchor_time);
            CREATE INDEX IF NOT EXISTS idx_metrics_kind_recorded_at ON metrics(kind, recorded_at);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
