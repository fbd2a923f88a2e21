//! Project configuration file support for promptloops.
//!
//! Loads configuration from `promptloops.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use promptloops_core::{default_agent_base, ControlConfig, InstructionPair};
use promptloops_critic::CriticPrompts;

/// Project-level configuration loaded from `promptloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default agent (applies to every role)
    pub agent: Option<String>,
    /// Global default model (applies to every role)
    pub model: Option<String>,
    /// Policy constants for the control loop
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub scorer: RoleConfig,
    #[serde(default)]
    pub rewriter: RoleConfig,
    #[serde(default)]
    pub actor: RoleConfig,
    #[serde(default)]
    pub instructions: InstructionFiles,
}

/// Configuration for a specific role (scorer, rewriter or actor)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub agent: Option<String>,
    pub model: Option<String>,
}

/// Files holding the static base instructions
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InstructionFiles {
    pub agent_base_file: Option<PathBuf>,
    pub critic_base_file: Option<PathBuf>,
}

/// The agent roles that can be configured separately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Scorer,
    Rewriter,
    Actor,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "promptloops.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    fn role(&self, role: Role) -> &RoleConfig {
        match role {
            Role::Scorer => &self.scorer,
            Role::Rewriter => &self.rewriter,
            Role::Actor => &self.actor,
        }
    }

    /// Effective agent for a role.
    /// Priority: [role].agent > global agent > None
    pub fn agent_for(&self, role: Role) -> Option<&str> {
        self.role(role).agent.as_deref().or(self.agent.as_deref())
    }

    /// Effective model for a role.
    /// Priority: [role].model > global model > None
    pub fn model_for(&self, role: Role) -> Option<&str> {
        self.role(role).model.as_deref().or(self.model.as_deref())
    }

    /// Build the starting instruction pair, reading base files relative to
    /// the working directory when configured
    pub fn initial_instructions(&self, working_dir: &Path) -> Result<InstructionPair> {
        let agent = match self.instructions.agent_base_file {
            Some(ref path) => read_base_file(working_dir, path)?,
            None => default_agent_base(),
        };
        let critic = match self.instructions.critic_base_file {
            Some(ref path) => read_base_file(working_dir, path)?,
            None => CriticPrompts::base_instructions(),
        };
        Ok(InstructionPair::new(agent, critic))
    }
}

fn read_base_file(working_dir: &Path, path: &Path) -> Result<String> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read instructions from {}", path.display()))?;
    Ok(content.trim_end().to_string())
}
