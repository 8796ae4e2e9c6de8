//! The agent runtime: tools, the model client, and the step loop that ties
//! them together.
//!
//! An [`Agent`] owns a system prompt, a set of tools and a memory of past
//! turns. Each run feeds the task to the model, executes the tools it asks
//! for, and repeats until the model produces a final answer or the step
//! budget runs out. Agents can be handed to other agents as tools, which is
//! how a coordinator delegates to specialists.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod tool;

pub use agent::{
    ActionStep, Agent, AgentBuilder, AgentRun, AgentStep, DEFAULT_MAX_STEPS,
    RunError,
};
pub use model_client::{ModelClient, ModelClientResponse};
