use async_trait::async_trait;
use promptloops_agent::{Agent, AgentConfig};
use tracing::{debug, info};

use crate::{CriticPrompts, Critique, CritiqueRequest, ScoreParseError};

/// Everything the scorer sees for one turn
#[derive(Clone, Copy)]
pub struct ScoreInput<'a> {
    /// Live critic instructions (base plus dynamic section)
    pub critic_instructions: &'a str,
    pub request: &'a CritiqueRequest,
    /// Current observation log, used by the critic for deduplication
    pub observations: &'a [String],
}

/// External collaborator that scores a solution on the four dimensions
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, input: ScoreInput<'_>) -> Result<Critique, ScorerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("Scorer agent error: {0}")]
    AgentError(String),

    #[error("Failed to parse scorer response: {0}")]
    ParseError(#[from] ScoreParseError),
}

/// Scorer backed by an agent CLI
pub struct AgentScorer {
    agent: Box<dyn Agent>,
    config: AgentConfig,
}

impl AgentScorer {
    pub fn new(agent: Box<dyn Agent>, config: AgentConfig) -> Self {
        Self { agent, config }
    }
}

#[async_trait]
impl Scorer for AgentScorer {
    async fn score(&self, input: ScoreInput<'_>) -> Result<Critique, ScorerError> {
        let prompt = CriticPrompts::build_scoring_prompt(
            input.critic_instructions,
            input.request,
            input.observations,
        );

        debug!(
            prompt_len = prompt.len(),
            observations = input.observations.len(),
            "Running scorer"
        );

        let output = self
            .agent
            .execute(&prompt, &self.config)
            .await
            .map_err(|e| ScorerError::AgentError(e.to_string()))?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Scorer completed"
        );

        if !output.success() {
            return Err(ScorerError::AgentError(format!(
                "Scorer exited with code {}: {}",
                output.exit_code,
                output.stderr_tail(5)
            )));
        }

        Ok(Critique::parse(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PreviousScores;
    use promptloops_agent::{AgentError, AgentOutput, AgentType};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedAgent {
        stdout: String,
        exit_code: i32,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedAgent {
        fn new(stdout: &str, exit_code: i32) -> Self {
            Self {
                stdout: stdout.to_string(),
                exit_code,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            "scripted"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::ClaudeCode
        }

        async fn execute(
            &self,
            prompt: &str,
            _config: &AgentConfig,
        ) -> Result<AgentOutput, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(AgentOutput::new(
                self.stdout.clone(),
                "boom".into(),
                self.exit_code,
                Duration::from_millis(1),
            ))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn binary_path(&self) -> &Path {
            Path::new("scripted")
        }
    }

    fn request() -> CritiqueRequest {
        CritiqueRequest {
            context: "ctx".into(),
            artifact: "ls".into(),
            question: "list files".into(),
            previous: PreviousScores::NoPriorAttempt,
            already_passed: false,
        }
    }

    #[tokio::test]
    async fn test_agent_scorer_parses_output() {
        let agent = ScriptedAgent::new(
            r#"<critique>{"correctness": -30, "scope": 0, "abstraction": 0, "optimization": 5, "feedback": "quote it", "observation": "Quote globs"}</critique>"#,
            0,
        );
        let scorer = AgentScorer::new(Box::new(agent), AgentConfig::new(PathBuf::from(".")));
        let request = request();
        let observations = vec!["Existing rule".to_string()];

        let critique = scorer
            .score(ScoreInput {
                critic_instructions: "CRITIC",
                request: &request,
                observations: &observations,
            })
            .await
            .unwrap();

        assert_eq!(critique.scores.correctness, -30);
        assert_eq!(critique.new_observation(), Some("Quote globs"));
    }

    #[tokio::test]
    async fn test_agent_scorer_nonzero_exit_is_error() {
        let agent = ScriptedAgent::new("", 2);
        let scorer = AgentScorer::new(Box::new(agent), AgentConfig::new(PathBuf::from(".")));
        let request = request();

        let result = scorer
            .score(ScoreInput {
                critic_instructions: "CRITIC",
                request: &request,
                observations: &[],
            })
            .await;

        match result {
            Err(ScorerError::AgentError(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected agent error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_agent_scorer_missing_block_is_parse_error() {
        let agent = ScriptedAgent::new("all good", 0);
        let scorer = AgentScorer::new(Box::new(agent), AgentConfig::new(PathBuf::from(".")));
        let request = request();

        let result = scorer
            .score(ScoreInput {
                critic_instructions: "CRITIC",
                request: &request,
                observations: &[],
            })
            .await;

        assert!(matches!(
            result,
            Err(ScorerError::ParseError(ScoreParseError::NoCritiqueFound))
        ));
    }
}
