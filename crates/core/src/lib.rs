//! Core logic of the agent: conversation state, tool dispatch, and the
//! control loop that alternates between the model and the tools.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod error;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, Stage, TranscriptSource};
pub use conversation::{ConversationState, RunInput, RunOutput};
pub use error::Error;
