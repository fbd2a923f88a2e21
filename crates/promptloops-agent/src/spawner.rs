use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::{AgentConfig, AgentError, AgentOutput};

/// Utility for spawning agent processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process, wait for it to exit and capture both streams.
    ///
    /// When `config.timeout` is set and elapses, the child is killed and
    /// `AgentError::Timeout` is returned.
    pub async fn spawn(
        binary: &Path,
        args: &[&str],
        config: &AgentConfig,
    ) -> Result<AgentOutput, AgentError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            working_dir = %config.working_dir.display(),
            "Spawning agent process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;

        let mut stdout_handle = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::ExecutionFailed("stdout not captured".into()))?;
        let mut stderr_handle = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::ExecutionFailed("stderr not captured".into()))?;

        let collect = async {
            let mut stdout = String::new();
            let mut stderr = String::new();
            let (out, err) = tokio::join!(
                stdout_handle.read_to_string(&mut stdout),
                stderr_handle.read_to_string(&mut stderr)
            );
            out?;
            err?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((stdout, stderr, status))
        };

        let (stdout, stderr, status) = match config.timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| AgentError::Timeout(limit))??,
            None => collect.await?,
        };

        let duration = start.elapsed();
        let exit_code = status.code().unwrap_or(-1);

        debug!(
            exit_code,
            duration_ms = duration.as_millis(),
            stdout_len = stdout.len(),
            "Agent process completed"
        );

        Ok(AgentOutput::new(
            stdout.trim_end().to_string(),
            stderr.trim_end().to_string(),
            exit_code,
            duration,
        ))
    }
}
