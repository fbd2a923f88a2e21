use thiserror::Error;

use crate::observations::ObservationError;

/// Errors that end a turn; session state is left as it was before the turn
#[derive(Error, Debug)]
pub enum TurnError {
    #[error(transparent)]
    Request(#[from] promptloops_critic::RequestError),

    #[error("Scorer error: {0}")]
    Scorer(#[from] promptloops_critic::ScorerError),

    #[error("Rewriter error: {0}")]
    Rewriter(#[from] promptloops_rewriter::RewriteError),

    #[error(transparent)]
    Observations(#[from] ObservationError),
}

impl TurnError {
    /// Rejected before any state was read or mutated
    pub fn is_request_error(&self) -> bool {
        matches!(self, TurnError::Request(_))
    }
}
