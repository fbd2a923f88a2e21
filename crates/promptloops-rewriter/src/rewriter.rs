use async_trait::async_trait;
use promptloops_agent::{Agent, AgentConfig};
use tracing::{debug, info};

use crate::{Rewrite, RewriteParseError, RewriteRequest, RewriterPrompts};

/// External collaborator that produces replacement dynamic sections
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<Rewrite, RewriteError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Rewriter agent error: {0}")]
    AgentError(String),

    #[error("Failed to parse rewriter response: {0}")]
    ParseError(#[from] RewriteParseError),
}

/// Rewriter backed by an agent CLI
pub struct AgentRewriter {
    agent: Box<dyn Agent>,
    config: AgentConfig,
}

impl AgentRewriter {
    pub fn new(agent: Box<dyn Agent>, config: AgentConfig) -> Self {
        Self { agent, config }
    }
}

#[async_trait]
impl Rewriter for AgentRewriter {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<Rewrite, RewriteError> {
        let prompt = RewriterPrompts::build_rewrite_prompt(&request);

        debug!(
            prompt_len = prompt.len(),
            cycle_count = request.cycle_count,
            "Running rewriter"
        );

        let output = self
            .agent
            .execute(&prompt, &self.config)
            .await
            .map_err(|e| RewriteError::AgentError(e.to_string()))?;

        info!(
            exit_code = output.exit_code,
            duration_secs = output.duration.as_secs_f64(),
            "Rewriter completed"
        );

        if !output.success() {
            return Err(RewriteError::AgentError(format!(
                "Rewriter exited with code {}: {}",
                output.exit_code,
                output.stderr_tail(5)
            )));
        }

        Ok(Rewrite::parse(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptloops_agent::{AgentError, AgentOutput, AgentType};
    use promptloops_critic::PerDimension;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedAgent {
        stdout: String,
        exit_code: i32,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Agent for ScriptedAgent {
        fn name(&self) -> &str {
            "scripted"
        }

        fn agent_type(&self) -> AgentType {
            AgentType::OpenCode
        }

        async fn execute(
            &self,
            prompt: &str,
            _config: &AgentConfig,
        ) -> Result<AgentOutput, AgentError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(AgentOutput::new(
                self.stdout.clone(),
                "rate limited".into(),
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

    async fn run(stdout: &str, exit_code: i32) -> Result<Rewrite, RewriteError> {
        let agent = ScriptedAgent {
            stdout: stdout.to_string(),
            exit_code,
            prompts: Mutex::new(Vec::new()),
        };
        let rewriter = AgentRewriter::new(Box::new(agent), AgentConfig::new(PathBuf::from(".")));
        let accumulated = PerDimension::new(-120, 40, 0, 10);
        let aggressiveness = PerDimension::new(4.0, 1.3, 0.0, 0.3);

        rewriter
            .rewrite(RewriteRequest {
                agent_instructions: "AGENT",
                critic_instructions: "CRITIC",
                accumulated: &accumulated,
                aggressiveness: &aggressiveness,
                cycle_count: 3,
                observations: &[],
            })
            .await
    }

    #[tokio::test]
    async fn test_agent_rewriter_parses_output() {
        let rewrite = run(
            r#"Thinking...
<rewrite>{"agent_section": "Check the fix compiles.", "critic_section": "", "reasoning": "correctness lagging"}</rewrite>"#,
            0,
        )
        .await
        .unwrap();

        assert_eq!(rewrite.agent_section, "Check the fix compiles.");
        assert!(rewrite.critic_section.is_empty());
        assert!(!rewrite.is_noop());
    }

    #[tokio::test]
    async fn test_agent_rewriter_failure() {
        match run("", 1).await {
            Err(RewriteError::AgentError(msg)) => assert!(msg.contains("rate limited")),
            other => panic!("expected agent error, got {:?}", other),
        }
    }
}
