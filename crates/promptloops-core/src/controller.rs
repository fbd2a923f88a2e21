use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use promptloops_critic::{CritiqueRequest, DimensionScores, PreviousScores, ScoreInput, Scorer};
use promptloops_logging::{LogEvent, Logger, ScoreLine, SessionLine, SessionWriter};
use promptloops_rewriter::{Rewrite, Rewriter};

use crate::observations::{is_duplicate, ObservationLog};
use crate::{ControlConfig, Decider, DedupPolicy, Optimizer, TuningSession, TurnError, TurnResult};

/// Runs one critique turn at a time against a [`TuningSession`]
pub struct Controller<'a> {
    scorer: &'a dyn Scorer,
    rewriter: &'a dyn Rewriter,
    observations: &'a dyn ObservationLog,
    config: ControlConfig,
    logger: Arc<Logger>,
    session_writer: Option<Arc<SessionWriter>>,
}

impl<'a> Controller<'a> {
    pub fn new(
        scorer: &'a dyn Scorer,
        rewriter: &'a dyn Rewriter,
        observations: &'a dyn ObservationLog,
        config: ControlConfig,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            scorer,
            rewriter,
            observations,
            config,
            logger,
            session_writer: None,
        }
    }

    /// Also record every turn and rewrite as JSONL
    pub fn with_session_writer(mut self, writer: Arc<SessionWriter>) -> Self {
        self.session_writer = Some(writer);
        self
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Validate a JSON critique request and run it as a turn
    pub async fn turn_json(
        &self,
        session: &mut TuningSession,
        json: &str,
    ) -> Result<TurnResult, TurnError> {
        let request = CritiqueRequest::from_json(json)?;
        self.turn(session, request).await
    }

    /// Run one turn.
    ///
    /// Accumulator and instruction changes are staged on a copy of the
    /// session and committed only when the whole turn succeeds. A new
    /// observation is appended to the log at the same point.
    pub async fn turn(
        &self,
        session: &mut TuningSession,
        request: CritiqueRequest,
    ) -> Result<TurnResult, TurnError> {
        let turn = session.turns();
        self.logger.log(&LogEvent::TurnStarted {
            turn,
            first_attempt: request.previous == PreviousScores::NoPriorAttempt,
        });

        if request.already_passed {
            self.logger.log(&LogEvent::TurnShortCircuited { turn });
            session.finish_turn();
            let result = TurnResult::already_passed();
            self.write_turn(turn, &result, session.accumulator.cycle_count());
            return Ok(result);
        }

        let known = self.observations.read()?;
        let critic_instructions = session.instructions.critic.render();
        let critique = self
            .scorer
            .score(ScoreInput {
                critic_instructions: &critic_instructions,
                request: &request,
                observations: &known,
            })
            .await?;

        self.logger.log(&LogEvent::CritiqueScored {
            turn,
            scores: score_line(&critique.scores),
            feedback: critique.feedback.clone(),
        });

        let mut staged = session.clone();
        staged.accumulator.record(&critique.scores);
        debug!(
            turn,
            cycle_count = staged.accumulator.cycle_count(),
            sums = ?staged.accumulator.sums(),
            "Scores accumulated"
        );

        let observation = self.pending_observation(turn, critique.new_observation(), &known);

        let verdict = Decider::new(&self.config).decide(&critique.scores, &request.previous);
        self.logger.log(&LogEvent::DecisionMade {
            turn,
            decision: verdict.decision.to_string(),
            improvement: Some(score_line(&verdict.improvement.scores)),
        });

        let optimizer = Optimizer::new(self.rewriter, &self.config);
        let mut optimized = false;
        if let Some(reason) = optimizer.should_run(&staged.accumulator) {
            self.logger.log(&LogEvent::OptimizerTriggered {
                turn,
                cycle_count: staged.accumulator.cycle_count(),
                mean_abs_error: staged.accumulator.mean_abs_error(),
                reason: reason.to_string(),
            });

            let accumulated = score_line_i64(staged.accumulator.sums());
            let mut all_observations = known.clone();
            all_observations.extend(observation.iter().cloned());
            let rewrite = optimizer.run(&mut staged, &all_observations).await?;
            self.log_rewrite(turn, accumulated, &rewrite);
            optimized = true;
        }

        if let Some(ref text) = observation {
            self.observations.append(text)?;
            self.logger.log(&LogEvent::ObservationRecorded {
                turn,
                text: text.clone(),
            });
        }

        staged.finish_turn();
        *session = staged;

        let result = TurnResult {
            critique_scores: Some(critique.scores),
            feedback: Some(critique.feedback),
            improvement_scores: Some(verdict.improvement.scores),
            additional_instructions: verdict.instruction.to_string(),
            decision: verdict.decision,
            observation,
            optimized,
        };

        info!(
            turn,
            decision = %result.decision,
            optimized,
            cycle_count = session.accumulator.cycle_count(),
            "Turn completed"
        );
        self.write_turn(turn, &result, session.accumulator.cycle_count());

        Ok(result)
    }

    /// The observation to record this turn, after the dedup policy.
    ///
    /// Appended only once the rest of the turn has succeeded.
    fn pending_observation(
        &self,
        turn: usize,
        observation: Option<&str>,
        known: &[String],
    ) -> Option<String> {
        let text = observation?;

        if self.config.dedup == DedupPolicy::Store && is_duplicate(known, text) {
            debug!(turn, observation = text, "Skipping duplicate observation");
            return None;
        }
        Some(text.to_string())
    }

    fn log_rewrite(&self, turn: usize, accumulated: ScoreLine, rewrite: &Rewrite) {
        self.logger.log(&LogEvent::InstructionsRewritten {
            turn,
            agent_section_len: rewrite.agent_section.len(),
            critic_section_len: rewrite.critic_section.len(),
            reasoning: rewrite.reasoning.clone(),
        });

        if let Some(ref writer) = self.session_writer {
            writer.write(&SessionLine::Rewrite {
                turn,
                accumulated,
                agent_section: rewrite.agent_section.clone(),
                critic_section: rewrite.critic_section.clone(),
                reasoning: rewrite.reasoning.clone(),
                timestamp: Utc::now(),
            });
        }
    }

    fn write_turn(&self, turn: usize, result: &TurnResult, cycle_count: u32) {
        if let Some(ref writer) = self.session_writer {
            writer.write(&SessionLine::Turn {
                turn,
                scores: result.critique_scores.as_ref().map(score_line),
                improvement: result.improvement_scores.as_ref().map(score_line),
                decision: result.decision.to_string(),
                feedback: result.feedback.clone(),
                observation: result.observation.clone(),
                cycle_count,
                optimized: result.optimized,
                timestamp: Utc::now(),
            });
        }
    }
}

pub(crate) fn score_line(scores: &DimensionScores) -> ScoreLine {
    ScoreLine {
        correctness: i64::from(scores.correctness),
        scope: i64::from(scores.scope),
        abstraction: i64::from(scores.abstraction),
        optimization: i64::from(scores.optimization),
    }
}

fn score_line_i64(sums: &promptloops_critic::PerDimension<i64>) -> ScoreLine {
    ScoreLine {
        correctness: sums.correctness,
        scope: sums.scope,
        abstraction: sums.abstraction,
        optimization: sums.optimization,
    }
}
