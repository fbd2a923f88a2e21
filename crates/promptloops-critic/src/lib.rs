mod critique;
mod dimension;
mod prompts;
mod request;
pub mod scorer;

pub use critique::{Critique, ScoreParseError};
pub use dimension::{Dimension, DimensionScores, PerDimension, SCORE_MAX, SCORE_MIN};
pub use prompts::CriticPrompts;
pub use request::{
    CritiqueArgs, CritiqueRequest, PreviousScores, RequestError, FIRST_ATTEMPT_SENTINEL,
};
pub use scorer::{AgentScorer, ScoreInput, Scorer, ScorerError};
