use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use promptloops_agent::{Agent, AgentConfig, ProcessSpawner};
use promptloops_critic::{CritiqueRequest, PreviousScores};
use promptloops_logging::{LogEvent, Logger};

use crate::{Controller, Decision, EpisodeOutcome, TuningSession};

/// One task for the outer agent loop
#[derive(Debug, Clone)]
pub struct Episode {
    /// The issue to solve
    pub question: String,
    /// Repository context handed to both actor and critic
    pub context: String,
    pub working_dir: PathBuf,
    /// Maximum critique turns (None = until the decider stops)
    pub max_turns: Option<usize>,
    /// Shell command whose success means the solution already passes
    pub check_command: Option<String>,
    pub actor_model: Option<String>,
}

impl Episode {
    pub fn new(question: String, working_dir: PathBuf) -> Self {
        Self {
            question,
            context: String::new(),
            working_dir,
            max_turns: None,
            check_command: None,
            actor_model: None,
        }
    }

    pub fn with_context(mut self, context: String) -> Self {
        self.context = context;
        self
    }

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = Some(max);
        self
    }

    pub fn with_check_command(mut self, command: String) -> Self {
        self.check_command = Some(command);
        self
    }

    pub fn with_actor_model(mut self, model: Option<String>) -> Self {
        self.actor_model = model;
        self
    }
}

/// Drives an actor agent through repeated controller turns.
///
/// The continuation instruction from each turn is the only retry signal:
/// the actor regenerates while the decision is `Continue`.
pub struct EpisodeRunner<'a> {
    actor: &'a dyn Agent,
    controller: &'a Controller<'a>,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

impl<'a> EpisodeRunner<'a> {
    pub fn new(actor: &'a dyn Agent, controller: &'a Controller<'a>, logger: Arc<Logger>) -> Self {
        Self {
            actor,
            controller,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    pub async fn run(&self, session: &mut TuningSession, episode: Episode) -> EpisodeOutcome {
        let started = Instant::now();
        let outcome = self.drive(session, &episode, started).await;

        self.logger.log(&LogEvent::EpisodeCompleted {
            turns: outcome.turns(),
            outcome: outcome.label().to_string(),
            duration_secs: started.elapsed().as_secs_f64(),
        });
        outcome
    }

    async fn drive(
        &self,
        session: &mut TuningSession,
        episode: &Episode,
        started: Instant,
    ) -> EpisodeOutcome {
        let config =
            AgentConfig::new(episode.working_dir.clone()).with_model(episode.actor_model.clone());
        let mut previous = PreviousScores::NoPriorAttempt;
        let mut guidance: Option<String> = None;
        let mut turns = 0;

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                info!("Episode interrupted by user");
                return EpisodeOutcome::interrupted(turns, started.elapsed());
            }

            if let Some(max) = episode.max_turns {
                if turns >= max {
                    return EpisodeOutcome::MaxTurnsReached {
                        turns,
                        solution: String::new(),
                        total_duration_secs: started.elapsed().as_secs_f64(),
                    };
                }
            }

            let prompt = ActorPrompts::build(
                &session.instructions.agent.render(),
                episode,
                guidance.as_deref(),
            );

            debug!(turn = turns, prompt_len = prompt.len(), "Running actor");
            let output = match self.actor.execute(&prompt, &config).await {
                Ok(output) if output.success() => output,
                Ok(output) => {
                    return self.fail(
                        turns,
                        format!("Actor exited with code {}", output.exit_code),
                        started,
                    )
                }
                Err(e) => return self.fail(turns, e.to_string(), started),
            };

            let solution = extract_solution(&output.stdout);
            let already_passed = match episode.check_command {
                Some(ref command) => run_check(command, &episode.working_dir).await,
                None => false,
            };

            let request = CritiqueRequest {
                context: episode.context.clone(),
                artifact: solution.clone(),
                question: episode.question.clone(),
                previous,
                already_passed,
            };

            let result = match self.controller.turn(session, request).await {
                Ok(result) => result,
                Err(e) => return self.fail(turns, e.to_string(), started),
            };
            turns += 1;

            let elapsed = started.elapsed().as_secs_f64();
            match (result.decision, result.critique_scores) {
                (Decision::AlreadyPassed, _) => {
                    return EpisodeOutcome::AlreadyPassed {
                        turns,
                        solution,
                        total_duration_secs: elapsed,
                    }
                }
                (Decision::StopSatisfied, Some(scores)) => {
                    return EpisodeOutcome::Satisfied {
                        turns,
                        solution,
                        scores,
                        total_duration_secs: elapsed,
                    }
                }
                (Decision::Continue, Some(scores)) => {
                    previous = PreviousScores::Scores(scores);
                    guidance = Some(format!(
                        "{}\n\n{}",
                        result.feedback.unwrap_or_default(),
                        result.additional_instructions
                    ));
                    if let Some(max) = episode.max_turns {
                        if turns >= max {
                            return EpisodeOutcome::MaxTurnsReached {
                                turns,
                                solution,
                                total_duration_secs: elapsed,
                            };
                        }
                    }
                }
                (decision, Some(scores)) => {
                    return EpisodeOutcome::Stopped {
                        turns,
                        decision,
                        solution,
                        scores,
                        total_duration_secs: elapsed,
                    }
                }
                (decision, None) => {
                    return self.fail(
                        turns,
                        format!("Turn ended with {} but carried no scores", decision),
                        started,
                    )
                }
            }
        }
    }

    fn fail(&self, turns: usize, error: String, started: Instant) -> EpisodeOutcome {
        warn!(error = %error, "Episode failed");
        self.logger.log(&LogEvent::ErrorEncountered {
            turn: turns,
            error: error.clone(),
        });
        EpisodeOutcome::failed(turns, error, started.elapsed())
    }
}

/// Prompt templates for the actor
pub struct ActorPrompts;

impl ActorPrompts {
    pub fn build(agent_instructions: &str, episode: &Episode, guidance: Option<&str>) -> String {
        let mut prompt = format!(
            "{instructions}\n\n## Repository Issue\n{question}\n",
            instructions = agent_instructions,
            question = episode.question,
        );

        if !episode.context.is_empty() {
            prompt.push_str(&format!("\n## Repository Context\n{}\n", episode.context));
        }

        if let Some(guidance) = guidance {
            prompt.push_str(&format!(
                "\n## Critique Of Your Previous Attempt\n{}\n\nProduce a corrected solution.\n",
                guidance
            ));
        }

        prompt.push_str("\nRespond with the shell commands only.");
        prompt
    }
}

/// Pull the commands out of a fenced block if the actor used one
pub fn extract_solution(output: &str) -> String {
    let trimmed = output.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed.to_string();
    };

    let after_fence = &trimmed[start + 3..];
    let body_start = after_fence.find('\n').map(|p| p + 1).unwrap_or(after_fence.len());
    let body = &after_fence[body_start..];

    match body.find("```") {
        Some(end) => body[..end].trim().to_string(),
        None => body.trim().to_string(),
    }
}

async fn run_check(command: &str, working_dir: &Path) -> bool {
    let config = AgentConfig::new(working_dir.to_path_buf());
    match ProcessSpawner::spawn(Path::new("sh"), &["-c", command], &config).await {
        Ok(output) => {
            debug!(exit_code = output.exit_code, "Check command finished");
            output.success()
        }
        Err(e) => {
            warn!(error = %e, "Check command could not run");
            false
        }
    }
}
