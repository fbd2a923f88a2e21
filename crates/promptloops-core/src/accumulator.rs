use promptloops_critic::{DimensionScores, PerDimension};
use serde::Serialize;
use thiserror::Error;

/// Per-dimension rewrite intensity, `abs(sum / cycle_count) / 10`
pub type Aggressiveness = PerDimension<f64>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccumulatorError {
    #[error("Aggressiveness requested with no recorded turns in the current cycle")]
    EmptyCycle,
}

/// Signed error sums per dimension since the last rewrite
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreAccumulator {
    sums: PerDimension<i64>,
    cycle_count: u32,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one turn's scores
    pub fn record(&mut self, scores: &DimensionScores) {
        for (dimension, score) in scores.iter() {
            *self.sums.get_mut(dimension) += i64::from(*score);
        }
        self.cycle_count += 1;
    }

    /// Zero all sums and the cycle count
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn sums(&self) -> &PerDimension<i64> {
        &self.sums
    }

    /// Turns recorded since the last reset
    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn is_empty(&self) -> bool {
        self.cycle_count == 0
    }

    /// Mean of the absolute accumulated error across the four dimensions
    pub fn mean_abs_error(&self) -> f64 {
        let total: i64 = self.sums.iter().map(|(_, sum)| sum.abs()).sum();
        total as f64 / 4.0
    }

    /// Rewrite intensity per dimension.
    ///
    /// Fails with [`AccumulatorError::EmptyCycle`] before the first `record`.
    pub fn aggressiveness(&self) -> Result<Aggressiveness, AccumulatorError> {
        if self.cycle_count == 0 {
            return Err(AccumulatorError::EmptyCycle);
        }
        let count = f64::from(self.cycle_count);
        Ok(self.sums.map(|sum| (*sum as f64 / count).abs() / 10.0))
    }
}
