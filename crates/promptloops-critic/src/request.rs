//! Critique request schema.
//!
//! The wire form is what the outer agent sends on every turn. It is
//! validated into a [`CritiqueRequest`] before any session state is touched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DimensionScores, SCORE_MAX, SCORE_MIN};

/// Out-of-band wire value meaning "no previous attempt"
pub const FIRST_ATTEMPT_SENTINEL: i32 = 101;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Malformed critique request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid critique request: {0}")]
    Validation(String),
}

/// Raw critique request as sent by the outer agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CritiqueArgs {
    pub context: String,
    pub answer: String,
    pub question: String,
    pub prev_correctness_score: i32,
    pub prev_scope_score: i32,
    pub prev_abstraction_score: i32,
    pub prev_optimization_score: i32,
    pub passed_all_tests_when_ran: bool,
}

/// Scores of the prior turn
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviousScores {
    /// First attempt in this critique cycle
    NoPriorAttempt,
    Scores(DimensionScores),
}

impl PreviousScores {
    /// Wire form, using the sentinel for the first attempt
    pub fn to_wire(&self) -> DimensionScores {
        match self {
            PreviousScores::NoPriorAttempt => DimensionScores::new(
                FIRST_ATTEMPT_SENTINEL,
                FIRST_ATTEMPT_SENTINEL,
                FIRST_ATTEMPT_SENTINEL,
                FIRST_ATTEMPT_SENTINEL,
            ),
            PreviousScores::Scores(scores) => *scores,
        }
    }
}

/// A validated critique request
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueRequest {
    /// Repository or task context
    pub context: String,
    /// The candidate solution
    pub artifact: String,
    /// The originating question or issue
    pub question: String,
    pub previous: PreviousScores,
    /// The solution already passed every check; the turn ends immediately
    pub already_passed: bool,
}

impl CritiqueRequest {
    /// Parse and validate a JSON request
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        let args: CritiqueArgs = serde_json::from_str(json)?;
        Self::try_from(args)
    }
}

impl TryFrom<CritiqueArgs> for CritiqueRequest {
    type Error = RequestError;

    fn try_from(args: CritiqueArgs) -> Result<Self, Self::Error> {
        let prev = DimensionScores::new(
            args.prev_correctness_score,
            args.prev_scope_score,
            args.prev_abstraction_score,
            args.prev_optimization_score,
        );

        let sentinels = prev
            .iter()
            .filter(|(_, v)| **v == FIRST_ATTEMPT_SENTINEL)
            .count();

        let previous = match sentinels {
            4 => PreviousScores::NoPriorAttempt,
            0 => {
                if let Some((dimension, value)) = prev.out_of_range() {
                    return Err(RequestError::Validation(format!(
                        "previous {} score {} outside [{}, {}]",
                        dimension, value, SCORE_MIN, SCORE_MAX
                    )));
                }
                PreviousScores::Scores(prev)
            }
            _ => {
                return Err(RequestError::Validation(format!(
                    "first-attempt marker {} must be passed for all four previous scores",
                    FIRST_ATTEMPT_SENTINEL
                )))
            }
        };

        if args.answer.trim().is_empty() && !args.passed_all_tests_when_ran {
            return Err(RequestError::Validation("answer must not be empty".into()));
        }

        Ok(Self {
            context: args.context,
            artifact: args.answer,
            question: args.question,
            previous,
            already_passed: args.passed_all_tests_when_ran,
        })
    }
}
