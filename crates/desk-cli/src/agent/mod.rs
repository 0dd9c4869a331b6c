//! Service-desk agent
//!
//! Alternates between a model turn and a tool turn until the model replies
//! without requesting tools.

mod agent_loop;
mod state;

pub use agent_loop::AgentLoop;
pub use state::{AgentConfig, AgentState};
