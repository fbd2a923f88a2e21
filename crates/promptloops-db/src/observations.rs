//! Observation store: an append-only, ordered log of critique-derived rules.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::sync::MutexGuard;

/// A stored observation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Observation store with a borrowed connection.
pub struct Observations<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Observations<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Append one observation line.
    pub fn append(&self, text: &str) -> Result<ObservationRecord, rusqlite::Error> {
        let record = ObservationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO observations (id, text, created_at) VALUES (?1, ?2, ?3)",
            params![record.id, record.text, record.created_at.to_rfc3339()],
        )?;

        Ok(record)
    }

    /// All observations in insertion order.
    pub fn list(&self) -> Result<Vec<ObservationRecord>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, text, created_at FROM observations ORDER BY seq ASC")?;
        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Observation texts in insertion order.
    pub fn texts(&self) -> Result<Vec<String>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT text FROM observations ORDER BY seq ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut texts = Vec::new();
        for row in rows {
            texts.push(row?);
        }

        Ok(texts)
    }

    /// Delete every observation, returning how many were removed.
    pub fn clear(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM observations", [])
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<ObservationRecord, rusqlite::Error> {
        let created_at_str: String = row.get(2)?;

        Ok(ObservationRecord {
            id: row.get(0)?,
            text: row.get(1)?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}
