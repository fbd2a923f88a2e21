use promptloops_critic::DimensionScores;
use serde::Serialize;
use std::time::Duration;

use crate::decider::ALREADY_PASSED_INSTRUCTION;
use crate::Decision;

/// What the controller returns for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique_scores: Option<DimensionScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement_scores: Option<DimensionScores>,
    /// Continuation instruction for the outer agent loop
    pub additional_instructions: String,
    pub decision: Decision,
    /// Observation appended to the log this turn, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    /// The optimizer rewrote the instructions during this turn
    pub optimized: bool,
}

impl TurnResult {
    /// Terminal result for a solution that already passed every check
    pub fn already_passed() -> Self {
        Self {
            critique_scores: None,
            feedback: None,
            improvement_scores: None,
            additional_instructions: ALREADY_PASSED_INSTRUCTION.to_string(),
            decision: Decision::AlreadyPassed,
            observation: None,
            optimized: false,
        }
    }
}

/// Final outcome of an episode driven by the outer agent loop
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EpisodeOutcome {
    /// The critic judged the solution good enough
    Satisfied {
        turns: usize,
        solution: String,
        scores: DimensionScores,
        total_duration_secs: f64,
    },
    /// The check command passed before scoring
    AlreadyPassed {
        turns: usize,
        solution: String,
        total_duration_secs: f64,
    },
    /// Stopped on regression or diminishing returns
    Stopped {
        turns: usize,
        decision: crate::Decision,
        solution: String,
        scores: DimensionScores,
        total_duration_secs: f64,
    },
    MaxTurnsReached {
        turns: usize,
        solution: String,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    Interrupted {
        turns: usize,
        total_duration_secs: f64,
    },
    Failed {
        turns: usize,
        error: String,
        total_duration_secs: f64,
    },
}

impl EpisodeOutcome {
    pub fn failed(turns: usize, error: String, duration: Duration) -> Self {
        Self::Failed {
            turns,
            error,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(turns: usize, duration: Duration) -> Self {
        Self::Interrupted {
            turns,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn turns(&self) -> usize {
        match self {
            Self::Satisfied { turns, .. }
            | Self::AlreadyPassed { turns, .. }
            | Self::Stopped { turns, .. }
            | Self::MaxTurnsReached { turns, .. }
            | Self::Interrupted { turns, .. }
            | Self::Failed { turns, .. } => *turns,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Satisfied { .. } => "satisfied",
            Self::AlreadyPassed { .. } => "already_passed",
            Self::Stopped { decision, .. } => decision.as_str(),
            Self::MaxTurnsReached { .. } => "max_turns_reached",
            Self::Interrupted { .. } => "interrupted",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Satisfied { .. } | Self::AlreadyPassed { .. } => 0,
            Self::Stopped { .. } | Self::MaxTurnsReached { .. } => 1,
            Self::Interrupted { .. } => 130,
            Self::Failed { .. } => 2,
        }
    }
}
