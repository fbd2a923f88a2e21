use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{Dimension, DimensionScores, SCORE_MAX, SCORE_MIN};

const OPEN_TAG: &str = "<critique>";
const CLOSE_TAG: &str = "</critique>";

/// The scorer's verdict on one solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    #[serde(flatten)]
    pub scores: DimensionScores,
    pub feedback: String,
    /// New rule learned from this critique, empty when it repeats a known one
    #[serde(default)]
    pub observation: String,
}

#[derive(Error, Debug)]
pub enum ScoreParseError {
    #[error("No <critique> block found in scorer output")]
    NoCritiqueFound,

    #[error("Malformed <critique> block")]
    MalformedBlock,

    #[error("Failed to parse critique JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("{dimension} score {value} outside [{min}, {max}]", min = SCORE_MIN, max = SCORE_MAX)]
    OutOfRange { dimension: Dimension, value: i32 },
}

impl Critique {
    /// Parse a critique from scorer output text.
    ///
    /// Expected format:
    /// ```text
    /// <critique>
    /// {"correctness": -20, "scope": 0, "abstraction": 10, "optimization": 0,
    ///  "feedback": "...", "observation": "..."}
    /// </critique>
    /// ```
    /// The last block wins when the scorer echoes the template first.
    pub fn parse(output: &str) -> Result<Self, ScoreParseError> {
        debug!(output_len = output.len(), "Parsing critique");

        let start = output.rfind(OPEN_TAG).ok_or(ScoreParseError::NoCritiqueFound)?;
        let end = output[start..]
            .find(CLOSE_TAG)
            .map(|p| start + p)
            .ok_or(ScoreParseError::MalformedBlock)?;

        let json_str = output[start + OPEN_TAG.len()..end].trim();
        let critique: Critique = serde_json::from_str(json_str)?;
        critique.validate()
    }

    fn validate(mut self) -> Result<Self, ScoreParseError> {
        if let Some((dimension, value)) = self.scores.out_of_range() {
            return Err(ScoreParseError::OutOfRange { dimension, value });
        }
        self.observation = self.observation.trim().to_string();
        Ok(self)
    }

    /// The observation, if the critic produced a new one
    pub fn new_observation(&self) -> Option<&str> {
        if self.observation.is_empty() {
            None
        } else {
            Some(&self.observation)
        }
    }
}
