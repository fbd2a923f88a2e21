mod cli;
mod output;
mod spawner;
mod traits;

pub use cli::CliAgent;
pub use output::AgentOutput;
pub use spawner::ProcessSpawner;
pub use traits::{Agent, AgentConfig, AgentError, AgentType};

/// Create an agent by type
pub fn create_agent(agent_type: AgentType) -> Box<dyn Agent> {
    Box::new(CliAgent::new(agent_type))
}
