use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::{Agent, AgentConfig, AgentError, AgentOutput, AgentType, ProcessSpawner};

/// An agent reached through its non-interactive command line mode
pub struct CliAgent {
    agent_type: AgentType,
    binary_path: PathBuf,
}

impl CliAgent {
    pub fn new(agent_type: AgentType) -> Self {
        Self {
            agent_type,
            binary_path: PathBuf::from(agent_type.default_binary()),
        }
    }

    pub fn with_binary_path(agent_type: AgentType, path: PathBuf) -> Self {
        Self {
            agent_type,
            binary_path: path,
        }
    }

    /// Arguments for a single prompt run
    fn build_args<'a>(&self, prompt: &'a str, model: Option<&'a str>) -> Vec<&'a str> {
        match self.agent_type {
            AgentType::ClaudeCode => {
                let mut args = vec!["--print", "--dangerously-skip-permissions"];
                if let Some(model) = model {
                    args.extend(["--model", model]);
                }
                // End of options so prompts starting with '-' stay positional
                args.extend(["--", prompt]);
                args
            }
            AgentType::OpenCode => {
                let mut args = vec!["run"];
                if let Some(model) = model {
                    args.extend(["--model", model]);
                }
                args.extend(["--prompt", prompt]);
                args
            }
        }
    }
}

#[async_trait]
impl Agent for CliAgent {
    fn name(&self) -> &str {
        self.agent_type.display_name()
    }

    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError> {
        debug!(
            agent = self.name(),
            prompt_len = prompt.len(),
            model = config.model.as_deref().unwrap_or("default"),
            "Executing agent"
        );

        let args = self.build_args(prompt, config.model.as_deref());
        ProcessSpawner::spawn(&self.binary_path, &args, config).await
    }
}
