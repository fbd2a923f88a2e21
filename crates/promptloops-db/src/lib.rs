//! Database layer for promptloops.
//!
//! Provides a `Database` struct that owns the SQLite connection and hands out
//! the observation store.

mod observations;

pub use observations::{ObservationRecord, Observations};

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/promptloops/promptloops.db`.
    pub fn open() -> Result<Self, rusqlite::Error> {
        let db_path = Self::default_path();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        Self::open_at(&db_path)
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptloops")
            .join("promptloops.db")
    }

    /// Access the observation store.
    pub fn observations(&self) -> Observations<'_> {
        // A poisoned lock only means another holder panicked mid-statement;
        // SQLite keeps the connection consistent, so keep using it.
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Observations::new(conn)
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS observations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
    }
}
