//! Turn-by-turn control policy.
//!
//! Compares the current critique with the previous one and decides whether
//! the outer agent should regenerate its solution or end the critique cycle.

use promptloops_critic::{DimensionScores, PreviousScores};
use serde::{Deserialize, Serialize};

use crate::ControlConfig;

/// Control signal emitted after a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Regenerate the solution and critique again
    Continue,
    /// Scores are good enough, end the cycle
    StopSatisfied,
    /// A dimension got markedly worse, end the cycle
    StopRegression,
    /// Progress is too small to be worth another attempt
    StopDiminishingReturns,
    /// The solution passed every check before scoring; nothing was evaluated
    AlreadyPassed,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Continue => "continue",
            Decision::StopSatisfied => "stop_satisfied",
            Decision::StopRegression => "stop_regression",
            Decision::StopDiminishingReturns => "stop_diminishing_returns",
            Decision::AlreadyPassed => "already_passed",
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Decision::Continue)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const ALREADY_PASSED_INSTRUCTION: &str =
    "All tests already passed. End the critique cycle now and finish.";
const FIRST_SOLID: &str =
    "First attempt is solid. Do not call critique again. End current critique cycle.";
const FIRST_NEEDS_WORK: &str = "First attempt needs work. Regenerate solution and critique again.";
const EXCELLENT: &str =
    "Excellent score. Do not call critique again. End current critique cycle.";
const REGRESSION: &str = "Major regression detected. End current critique cycle.";
const DIMINISHING: &str =
    "Diminishing returns. Do not call critique again. End current critique cycle.";
const PROGRESS: &str = "Good progress. Continue critique cycle. Regenerate and call again.";

/// How much closer to ideal each dimension moved since the previous turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Improvement {
    /// `abs(prev) - abs(crit)` per dimension; positive is better
    pub scores: DimensionScores,
    pub average: f64,
    /// The smallest per-dimension improvement
    pub max_regression: i32,
}

impl Improvement {
    pub fn between(previous: &DimensionScores, current: &DimensionScores) -> Self {
        let scores =
            DimensionScores::from_fn(|d| previous.get(d).abs() - current.get(d).abs());
        let total: i32 = scores.iter().map(|(_, v)| *v).sum();
        let max_regression = scores.iter().map(|(_, v)| *v).min().unwrap_or(0);

        Self {
            scores,
            average: f64::from(total) / 4.0,
            max_regression,
        }
    }
}

/// The decider's output for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub decision: Decision,
    /// Advisory text for the outer agent loop
    pub instruction: &'static str,
    /// On a first attempt this is measured against the wire sentinel, so
    /// it is reported but never drives the decision
    pub improvement: Improvement,
}

/// Applies the continue/stop policy
pub struct Decider<'a> {
    config: &'a ControlConfig,
}

impl<'a> Decider<'a> {
    pub fn new(config: &'a ControlConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, current: &DimensionScores, previous: &PreviousScores) -> Verdict {
        let satisfied = current.all_within(self.config.satisfied_magnitude);
        let improvement = Improvement::between(&previous.to_wire(), current);

        let (decision, instruction) = match previous {
            PreviousScores::NoPriorAttempt if satisfied => (Decision::StopSatisfied, FIRST_SOLID),
            PreviousScores::NoPriorAttempt => (Decision::Continue, FIRST_NEEDS_WORK),
            PreviousScores::Scores(_) if satisfied => (Decision::StopSatisfied, EXCELLENT),
            PreviousScores::Scores(_)
                if improvement.max_regression <= self.config.regression_limit =>
            {
                (Decision::StopRegression, REGRESSION)
            }
            PreviousScores::Scores(_) if improvement.average < self.config.min_avg_improvement => {
                (Decision::StopDiminishingReturns, DIMINISHING)
            }
            PreviousScores::Scores(_) => (Decision::Continue, PROGRESS),
        };

        Verdict {
            decision,
            instruction,
            improvement,
        }
    }
}
