//! Line-oriented critique service: one JSON request in, one JSON result out.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use promptloops_core::{Controller, TurnError, TuningSession};

#[derive(Debug, Serialize)]
struct ErrorLine {
    error: String,
    /// The line was rejected before any state was read
    rejected: bool,
}

/// Process requests from `reader` strictly in order until EOF.
///
/// Every failure is reported as an `{"error": ..}` line and the loop keeps
/// going; the session only changes on successful turns. Returns the number
/// of lines answered.
pub async fn serve<R, W>(
    controller: &Controller<'_>,
    session: &mut TuningSession,
    reader: R,
    mut writer: W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match controller.turn_json(session, &line).await {
            Ok(result) => serde_json::to_string(&result)?,
            Err(e) => {
                warn!(error = %e, "Turn failed");
                error_line(&e)?
            }
        };

        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        answered += 1;
    }

    info!(answered, turns = session.turns(), "Input closed");
    Ok(answered)
}

fn error_line(error: &TurnError) -> Result<String> {
    Ok(serde_json::to_string(&ErrorLine {
        error: error.to_string(),
        rejected: error.is_request_error(),
    })?)
}
