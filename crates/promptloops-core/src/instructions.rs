use promptloops_rewriter::DYNAMIC_SECTION_MARKER;
use serde::Serialize;

/// An instruction text split into an immutable base and a replaceable tail.
///
/// The dynamic section is always replaced wholesale, never appended to, so
/// repeated rewrites cannot grow the text without bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    base: String,
    dynamic: String,
}

impl Instruction {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            dynamic: String::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn dynamic(&self) -> &str {
        &self.dynamic
    }

    /// The live text: base followed by the dynamic section
    pub fn render(&self) -> String {
        format!("{}{}", self.base, self.dynamic)
    }

    /// The text shown to the rewriter, with the replaceable section marked
    pub fn with_marker(&self) -> String {
        format!("{}{}{}", self.base, DYNAMIC_SECTION_MARKER, self.dynamic)
    }

    pub fn replace_dynamic(&mut self, dynamic: String) {
        self.dynamic = dynamic;
    }
}

/// The agent and critic instructions currently governing behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionPair {
    pub agent: Instruction,
    pub critic: Instruction,
}

impl InstructionPair {
    pub fn new(agent_base: impl Into<String>, critic_base: impl Into<String>) -> Self {
        Self {
            agent: Instruction::new(agent_base),
            critic: Instruction::new(critic_base),
        }
    }

    /// Install a rewrite.
    ///
    /// The agent's dynamic section is the observation log followed by the
    /// rewriter's agent text; the critic's is the rewriter's critic text.
    pub fn apply_rewrite(&mut self, observations: &[String], agent_text: &str, critic_text: &str) {
        self.agent
            .replace_dynamic(format!("\n{}\n{}", observations.join("\n"), agent_text));
        self.critic.replace_dynamic(critic_text.to_string());
    }
}

/// Default static instructions for the solving agent
pub fn default_agent_base() -> String {
    r#"You solve repository issues with the minimal set of shell commands.
Output only executable commands, with no commentary.

REQUIRED: Submit every candidate solution for critique before responding, and
follow the additional instructions returned by the critique to the letter.
REQUIRED: On the first attempt, report previous scores as 101."#
        .to_string()
}
