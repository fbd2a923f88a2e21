use std::sync::{Mutex, PoisonError};

use promptloops_db::Database;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObservationError {
    #[error("Observation store error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Append-only store of short rules learned from critiques
pub trait ObservationLog: Send + Sync {
    /// Add one observation line
    fn append(&self, text: &str) -> Result<(), ObservationError>;

    /// All observations, oldest first
    fn read(&self) -> Result<Vec<String>, ObservationError>;
}

/// Observation log held in process memory
#[derive(Debug, Default)]
pub struct MemoryObservationLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(lines: Vec<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }
}

impl ObservationLog for MemoryObservationLog {
    fn append(&self, text: &str) -> Result<(), ObservationError> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Vec<String>, ObservationError> {
        Ok(self
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

impl ObservationLog for Database {
    fn append(&self, text: &str) -> Result<(), ObservationError> {
        self.observations().append(text)?;
        Ok(())
    }

    fn read(&self) -> Result<Vec<String>, ObservationError> {
        Ok(self.observations().texts()?)
    }
}

/// Canonical form used for store-side deduplication: trimmed, lowercased,
/// whitespace collapsed, trailing punctuation dropped
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_end_matches(['.', '!', ';'])
        .to_string()
}

/// True when `candidate` matches an existing observation after normalization
pub fn is_duplicate(existing: &[String], candidate: &str) -> bool {
    let candidate = normalize(candidate);
    existing.iter().any(|line| normalize(line) == candidate)
}
