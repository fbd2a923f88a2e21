use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Scores for the four dimensions as carried in log events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreLine {
    pub correctness: i64,
    pub scope: i64,
    pub abstraction: i64,
    pub optimization: i64,
}

impl std::fmt::Display for ScoreLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "C:{:+} S:{:+} A:{:+} O:{:+}",
            self.correctness, self.scope, self.abstraction, self.optimization
        )
    }
}

/// Structured log events for the prompt-tuning loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    SessionStarted {
        scorer: String,
        rewriter: String,
        observations: usize,
    },
    TurnStarted {
        turn: usize,
        first_attempt: bool,
    },
    /// The solution already passed every check; nothing was scored
    TurnShortCircuited {
        turn: usize,
    },
    CritiqueScored {
        turn: usize,
        scores: ScoreLine,
        feedback: String,
    },
    ObservationRecorded {
        turn: usize,
        text: String,
    },
    DecisionMade {
        turn: usize,
        decision: String,
        improvement: Option<ScoreLine>,
    },
    OptimizerTriggered {
        turn: usize,
        cycle_count: u32,
        mean_abs_error: f64,
        reason: String,
    },
    InstructionsRewritten {
        turn: usize,
        agent_section_len: usize,
        critic_section_len: usize,
        reasoning: String,
    },
    EpisodeCompleted {
        turns: usize,
        outcome: String,
        duration_secs: f64,
    },
    ErrorEncountered {
        turn: usize,
        error: String,
    },
}

impl LogEvent {
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for promptloops events - console output plus optional file
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
    quiet: bool,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
            quiet: false,
        }
    }

    /// A logger that prints nothing (tests, embedded use)
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            file_writer: None,
            quiet: true,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
            quiet: false,
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.with_timestamp());
            }
        }

        if self.quiet {
            return;
        }

        let line = match self.format {
            LogFormat::Json => serde_json::to_string(event).ok(),
            LogFormat::Pretty => Self::render_pretty(event),
            LogFormat::Compact => Self::render_compact(event),
        };

        if let Some(line) = line {
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn render_pretty(event: &LogEvent) -> Option<String> {
        let line = match event {
            LogEvent::SessionStarted {
                scorer,
                rewriter,
                observations,
            } => format!(
                "{} {}  {} {}  {} {}  {} {}",
                "promptloops".bold().bright_white(),
                "│".bright_blue(),
                "scorer:".dimmed(),
                scorer,
                "rewriter:".dimmed(),
                rewriter,
                "observations:".dimmed(),
                observations
            ),
            LogEvent::TurnStarted {
                turn,
                first_attempt,
            } => {
                let text = format!("─ Turn {} ", turn + 1);
                let suffix = if *first_attempt { " (first attempt)" } else { "" };
                format!(
                    "{}{}{}",
                    "┌".bright_blue(),
                    text.bright_blue().bold(),
                    suffix.dimmed()
                )
            }
            LogEvent::TurnShortCircuited { .. } => format!(
                "  {} {}",
                "✓".bright_green(),
                "All checks already passed, ending cycle".bright_green()
            ),
            LogEvent::CritiqueScored {
                scores, feedback, ..
            } => format!(
                "  {} {}  {}\n    {}",
                "▶".bright_magenta(),
                "CRITIC".bright_magenta().bold(),
                scores,
                truncate(feedback, 200).dimmed()
            ),
            LogEvent::ObservationRecorded { text, .. } => {
                format!("    {} {}", "+ observation:".cyan(), text)
            }
            LogEvent::DecisionMade {
                decision,
                improvement,
                ..
            } => {
                let improvement = improvement
                    .map(|i| format!(" (improvement {})", i))
                    .unwrap_or_default();
                let text = format!("→ Decision: {}{}", decision, improvement);
                let styled = if decision == "continue" {
                    text.bright_yellow()
                } else if decision == "stop_regression" {
                    text.bright_red()
                } else {
                    text.bright_green()
                };
                format!("    {}", styled)
            }
            LogEvent::OptimizerTriggered {
                cycle_count,
                mean_abs_error,
                reason,
                ..
            } => format!(
                "  {} {} after {} turn(s), mean |error| {:.1} ({})",
                "⟳".bright_cyan(),
                "OPTIMIZER".bright_cyan().bold(),
                cycle_count,
                mean_abs_error,
                reason
            ),
            LogEvent::InstructionsRewritten { reasoning, .. } => {
                format!("    {} {}", "✎ rewritten:".bright_cyan(), truncate(reasoning, 200))
            }
            LogEvent::EpisodeCompleted {
                turns,
                outcome,
                duration_secs,
            } => format!(
                "{} {} after {} turn(s) in {:.1}s",
                "■".bright_blue(),
                outcome.bold(),
                turns,
                duration_secs
            ),
            LogEvent::ErrorEncountered { turn, error } => format!(
                "{} Error in turn {}: {}",
                "✗".bright_red(),
                turn + 1,
                error.bright_red()
            ),
        };
        Some(line)
    }

    fn render_compact(event: &LogEvent) -> Option<String> {
        let ts = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::SessionStarted { .. } => "session:start".to_string(),
            LogEvent::TurnStarted { turn, .. } => format!("turn:start:{}", turn + 1),
            LogEvent::TurnShortCircuited { turn } => format!("turn:passed:{}", turn + 1),
            LogEvent::CritiqueScored { turn, scores, .. } => {
                format!("critic:{} {}", turn + 1, scores)
            }
            LogEvent::ObservationRecorded { turn, text } => {
                format!("observation:{} {}", turn + 1, text)
            }
            LogEvent::DecisionMade { turn, decision, .. } => {
                format!("decision:{} {}", turn + 1, decision)
            }
            LogEvent::OptimizerTriggered {
                turn, cycle_count, ..
            } => format!("optimizer:{} cycles={}", turn + 1, cycle_count),
            LogEvent::InstructionsRewritten { .. } => return None,
            LogEvent::EpisodeCompleted {
                turns,
                outcome,
                duration_secs,
            } => format!("episode:{} {} {:.1}s", outcome, turns, duration_secs),
            LogEvent::ErrorEncountered { turn, error } => format!("error:{}:{}", turn + 1, error),
        };
        Some(format!("[{}] {}", ts, msg))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
