//! Conversation-related types.

use recruit_agent_model::{ModelMessage, ToolCallRequest};
use serde::{Deserialize, Serialize};

/// The request that starts a run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunInput {
    /// The message from the user.
    pub input_message: String,
}

/// The outcome of a run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunOutput {
    /// The content of the final assistant message.
    pub result: String,
}

/// The state of one run: the message history and the user input that has
/// not been added to it yet.
///
/// The state is moved through the stages of the agent, each stage takes it
/// by value and hands back the updated one. Messages are only ever
/// appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub(crate) input_message: Option<String>,
    pub(crate) messages: Vec<ModelMessage>,
}

impl ConversationState {
    /// Creates a state with a pending user input and an empty history.
    #[inline]
    pub fn with_input<S: Into<String>>(input_message: S) -> Self {
        Self {
            input_message: Some(input_message.into()),
            messages: vec![],
        }
    }

    /// Returns the user input that has not been consumed yet.
    #[inline]
    pub fn input_message(&self) -> Option<&str> {
        self.input_message.as_deref()
    }

    /// Returns the message history, oldest first.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last_message(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Returns the tool calls requested by the last message that have not
    /// been answered yet.
    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        self.last_message()
            .map(ModelMessage::tool_calls)
            .unwrap_or_default()
    }
}

impl From<RunInput> for ConversationState {
    #[inline]
    fn from(input: RunInput) -> Self {
        Self::with_input(input.input_message)
    }
}
