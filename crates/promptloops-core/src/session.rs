use serde::Serialize;

use crate::{InstructionPair, ScoreAccumulator};

/// Mutable state of one tuning session.
///
/// Passed explicitly to every controller call; each turn takes it by
/// `&mut`, so at most one turn mutates a session at a time.
#[derive(Debug, Clone, Serialize)]
pub struct TuningSession {
    pub accumulator: ScoreAccumulator,
    pub instructions: InstructionPair,
    turns: usize,
    rewrites: usize,
}

impl TuningSession {
    pub fn new(instructions: InstructionPair) -> Self {
        Self {
            accumulator: ScoreAccumulator::new(),
            instructions,
            turns: 0,
            rewrites: 0,
        }
    }

    /// Completed turns, including short-circuited ones
    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Optimizer runs so far
    pub fn rewrites(&self) -> usize {
        self.rewrites
    }

    pub(crate) fn finish_turn(&mut self) {
        self.turns += 1;
    }

    pub(crate) fn count_rewrite(&mut self) {
        self.rewrites += 1;
    }
}
