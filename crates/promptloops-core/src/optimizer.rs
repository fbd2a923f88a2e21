use promptloops_rewriter::{Rewrite, RewriteError, RewriteRequest, Rewriter};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Aggressiveness, ControlConfig, ScoreAccumulator, TuningSession};

/// Why the optimizer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// Mean absolute accumulated error crossed the error trigger
    ErrorThreshold,
    /// The cycle reached its turn limit
    Periodic,
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerReason::ErrorThreshold => write!(f, "error threshold"),
            TriggerReason::Periodic => write!(f, "periodic"),
        }
    }
}

/// Rewrites the dynamic instruction sections from accumulated error
pub struct Optimizer<'a> {
    rewriter: &'a dyn Rewriter,
    config: &'a ControlConfig,
}

impl<'a> Optimizer<'a> {
    pub fn new(rewriter: &'a dyn Rewriter, config: &'a ControlConfig) -> Self {
        Self { rewriter, config }
    }

    /// Check the trigger conditions against the accumulator
    pub fn should_run(&self, accumulator: &ScoreAccumulator) -> Option<TriggerReason> {
        if accumulator.is_empty() {
            return None;
        }
        if accumulator.mean_abs_error() > self.config.error_trigger {
            Some(TriggerReason::ErrorThreshold)
        } else if accumulator.cycle_count() >= self.config.cycle_trigger {
            Some(TriggerReason::Periodic)
        } else {
            None
        }
    }

    /// Rewrite the session's instructions and reset its accumulator.
    ///
    /// `observations` is the full observation log. On error the session is
    /// left untouched.
    pub async fn run(
        &self,
        session: &mut TuningSession,
        observations: &[String],
    ) -> Result<Rewrite, RewriteError> {
        let aggressiveness = match session.accumulator.aggressiveness() {
            Ok(aggressiveness) => aggressiveness,
            Err(e) => {
                debug!(error = %e, "Rewriting with zero aggressiveness");
                Aggressiveness::default()
            }
        };

        let agent_instructions = session.instructions.agent.with_marker();
        let critic_instructions = session.instructions.critic.with_marker();
        let request = RewriteRequest {
            agent_instructions: &agent_instructions,
            critic_instructions: &critic_instructions,
            accumulated: session.accumulator.sums(),
            aggressiveness: &aggressiveness,
            cycle_count: session.accumulator.cycle_count(),
            observations,
        };

        let rewrite = self.rewriter.rewrite(request).await?;
        if rewrite.is_noop() {
            warn!("Rewriter returned empty sections; dynamic sections will be cleared");
        }

        info!(
            cycle_count = session.accumulator.cycle_count(),
            agent_section_len = rewrite.agent_section.len(),
            critic_section_len = rewrite.critic_section.len(),
            reasoning = %rewrite.reasoning,
            "Instructions rewritten"
        );

        session.instructions.apply_rewrite(
            observations,
            &rewrite.agent_section,
            &rewrite.critic_section,
        );
        session.accumulator.reset();
        session.count_rewrite();

        Ok(rewrite)
    }
}
