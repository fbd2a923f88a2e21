use serde::Serialize;
use std::time::Duration;

/// Output captured from one agent run
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(serialize_with = "as_secs")]
    pub duration: Duration,
}

impl AgentOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The last few stderr lines, for error messages
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

fn as_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
