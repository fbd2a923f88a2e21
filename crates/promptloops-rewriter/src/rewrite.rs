use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use promptloops_critic::{Dimension, PerDimension};

const OPEN_TAG: &str = "<rewrite>";
const CLOSE_TAG: &str = "</rewrite>";

/// Literal marker separating an instruction's base from its replaceable section
pub const DYNAMIC_SECTION_MARKER: &str = "\nDYNAMIC SECTION (WHAT YOU ARE REPLACING):\n";

/// How hard the rewriter should push on one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    /// 0-3: leave alone or a gentle nudge
    Minimal,
    /// 3-7: firm, measured correction
    Firm,
    /// 7 and above: strong, imperative correction
    Critical,
}

impl Intensity {
    pub fn from_aggressiveness(aggressiveness: f64) -> Self {
        if aggressiveness >= 7.0 {
            Intensity::Critical
        } else if aggressiveness >= 3.0 {
            Intensity::Firm
        } else {
            Intensity::Minimal
        }
    }
}

/// Which way a dimension has drifted over the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drift {
    Deficiency,
    Excess,
    Balanced,
}

impl Drift {
    pub fn from_error(accumulated: i64) -> Self {
        match accumulated {
            e if e < 0 => Drift::Deficiency,
            e if e > 0 => Drift::Excess,
            _ => Drift::Balanced,
        }
    }
}

/// Input to one rewrite call
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    /// Agent instructions with the dynamic-section marker in place
    pub agent_instructions: &'a str,
    /// Critic instructions with the dynamic-section marker in place
    pub critic_instructions: &'a str,
    /// Raw signed error accumulated over the cycle
    pub accumulated: &'a PerDimension<i64>,
    pub aggressiveness: &'a PerDimension<f64>,
    pub cycle_count: u32,
    pub observations: &'a [String],
}

impl RewriteRequest<'_> {
    /// Per-dimension guidance derived from error sign and aggressiveness
    pub fn guidance(&self) -> Vec<(Dimension, Drift, Intensity)> {
        Dimension::ALL
            .into_iter()
            .map(|d| {
                (
                    d,
                    Drift::from_error(*self.accumulated.get(d)),
                    Intensity::from_aggressiveness(*self.aggressiveness.get(d)),
                )
            })
            .collect()
    }
}

/// Replacement dynamic sections produced by the rewriter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rewrite {
    #[serde(default)]
    pub agent_section: String,
    #[serde(default)]
    pub critic_section: String,
    /// Why the rewriter made these changes; logged only
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Error, Debug)]
pub enum RewriteParseError {
    #[error("No <rewrite> block found in rewriter output")]
    NoRewriteFound,

    #[error("Malformed <rewrite> block")]
    MalformedBlock,

    #[error("Failed to parse rewrite JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

impl Rewrite {
    /// Parse the last `<rewrite>` block from rewriter output
    pub fn parse(output: &str) -> Result<Self, RewriteParseError> {
        debug!(output_len = output.len(), "Parsing rewrite");

        let start = output
            .rfind(OPEN_TAG)
            .ok_or(RewriteParseError::NoRewriteFound)?;
        let end = output[start..]
            .find(CLOSE_TAG)
            .map(|p| start + p)
            .ok_or(RewriteParseError::MalformedBlock)?;

        let rewrite: Rewrite = serde_json::from_str(output[start + OPEN_TAG.len()..end].trim())?;
        Ok(rewrite)
    }

    pub fn is_noop(&self) -> bool {
        self.agent_section.trim().is_empty() && self.critic_section.trim().is_empty()
    }
}
