use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::AgentOutput;

/// Errors that can occur while running an agent CLI
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to spawn agent process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Agent execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Agent '{0}' is not available on PATH")]
    NotAvailable(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),
}

/// Configuration for a single agent invocation
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Working directory the agent runs in
    pub working_dir: PathBuf,
    /// Optional wall-clock limit (None = wait for the process to exit)
    pub timeout: Option<Duration>,
    /// Extra environment variables
    pub env_vars: HashMap<String, String>,
    /// Model to request, if the agent supports model selection
    pub model: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            env_vars: HashMap::new(),
            model: None,
        }
    }
}

impl AgentConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Supported agent CLIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    ClaudeCode,
    OpenCode,
}

impl AgentType {
    /// Default executable name looked up on PATH
    pub fn default_binary(&self) -> &'static str {
        match self {
            AgentType::ClaudeCode => "claude",
            AgentType::OpenCode => "opencode",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentType::ClaudeCode => "Claude Code",
            AgentType::OpenCode => "OpenCode",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentType::ClaudeCode => write!(f, "claude-code"),
            AgentType::OpenCode => write!(f, "opencode"),
        }
    }
}

impl std::str::FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-code" | "claudecode" => Ok(AgentType::ClaudeCode),
            "opencode" | "open-code" => Ok(AgentType::OpenCode),
            _ => Err(format!("Unknown agent type: {}", s)),
        }
    }
}

/// A model-backed agent reachable through a blocking request/response call.
///
/// Scorer, rewriter and actor calls all go through this trait. The caller
/// suspends until the process exits; partial output is never consumed.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Human-readable name of the agent
    fn name(&self) -> &str;

    fn agent_type(&self) -> AgentType;

    /// Run the agent once with the given prompt
    async fn execute(&self, prompt: &str, config: &AgentConfig) -> Result<AgentOutput, AgentError>;

    /// Check if the agent CLI is installed
    async fn is_available(&self) -> bool;

    fn binary_path(&self) -> &Path;
}
