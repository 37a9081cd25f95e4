use serde_json::Value;

use crate::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// A complete message in the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A human input text.
    User(String),
    /// A reply from the model.
    Assistant(AssistantMessage),
    /// A tool call result.
    Tool(ToolCallResult),
}

impl ModelMessage {
    /// Returns the text carried by this message.
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::System(text) | ModelMessage::User(text) => text,
            ModelMessage::Assistant(msg) => &msg.content,
            ModelMessage::Tool(result) => &result.content,
        }
    }

    /// Returns the tool calls requested by this message.
    ///
    /// Only assistant messages can request tool calls, this is empty for
    /// the other roles.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            ModelMessage::Assistant(msg) => &msg.tool_calls,
            _ => &[],
        }
    }
}

/// A reply from the model, possibly asking for tool calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssistantMessage {
    /// The text of the reply, may be empty when only tools are called.
    pub content: String,
    /// Tool calls requested by the model, in the order they were emitted.
    pub tool_calls: Vec<ToolCallRequest>,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The identifier of the tool call request this result answers.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool, as a
    /// [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
