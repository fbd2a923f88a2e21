//! # promptloops-core
//!
//! The adaptive prompt-control loop: per-turn critique scores accumulate into
//! drift signals, a decider turns each critique into a continue/stop signal,
//! and an optimizer periodically rewrites the agent and critic instructions.
//!
//! ## Key Types
//!
//! - [`Controller`] - Runs one critique turn against a [`TuningSession`]
//! - [`ScoreAccumulator`] - Signed error sums per dimension
//! - [`Decider`] - Continue/stop policy
//! - [`Optimizer`] - Instruction rewrite and accumulator reset
//! - [`EpisodeRunner`] - Outer loop driving an actor agent

mod accumulator;
mod config;
mod controller;
mod decider;
mod episode;
mod error;
mod instructions;
pub mod observations;
mod optimizer;
mod outcome;
mod session;

pub use accumulator::{AccumulatorError, Aggressiveness, ScoreAccumulator};
pub use config::{ControlConfig, DedupPolicy};
pub use controller::Controller;
pub use decider::{Decider, Decision, Improvement, Verdict};
pub use episode::{extract_solution, ActorPrompts, Episode, EpisodeRunner};
pub use error::TurnError;
pub use instructions::{default_agent_base, Instruction, InstructionPair};
pub use observations::{MemoryObservationLog, ObservationError, ObservationLog};
pub use optimizer::{Optimizer, TriggerReason};
pub use outcome::{EpisodeOutcome, TurnResult};
pub use session::TuningSession;
