use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ScoreLine;

/// One line of the session JSONL file.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionLine {
    SessionStart {
        timestamp: DateTime<Utc>,
        label: String,
        scorer: String,
        rewriter: String,
    },
    Turn {
        turn: usize,
        scores: Option<ScoreLine>,
        improvement: Option<ScoreLine>,
        decision: String,
        feedback: Option<String>,
        observation: Option<String>,
        cycle_count: u32,
        optimized: bool,
        timestamp: DateTime<Utc>,
    },
    Rewrite {
        turn: usize,
        accumulated: ScoreLine,
        agent_section: String,
        critic_section: String,
        reasoning: String,
        timestamp: DateTime<Utc>,
    },
    SessionEnd {
        outcome: String,
        turns: usize,
        duration_secs: f64,
        timestamp: DateTime<Utc>,
    },
}

/// Writes session data as JSONL, one file per session.
pub struct SessionWriter {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl SessionWriter {
    /// Create a writer in `<data_dir>/promptloops/sessions/`.
    pub fn new(label: &str) -> io::Result<Self> {
        Self::in_dir(&Self::sessions_dir()?, label)
    }

    /// Create a writer in a specific directory. The file name is the UTC
    /// start time plus a short hash of `label`.
    pub fn in_dir(dir: &Path, label: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let timestamp_str = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();

        let mut hasher = Sha256::new();
        hasher.update(label.as_bytes());
        let hash = hex::encode(hasher.finalize());

        let path = dir.join(format!("{}_{}.jsonl", timestamp_str, &hash[..6]));
        let file = File::create(&path)?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, line: &SessionLine) {
        if let Ok(json) = serde_json::to_string(line) {
            if let Ok(mut writer) = self.file.lock() {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    fn sessions_dir() -> io::Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine data directory",
            )
        })?;
        Ok(data_dir.join("promptloops").join("sessions"))
    }
}
