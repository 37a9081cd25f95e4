use recruit_agent_model::{ModelMessage, ModelRequest};

use super::{Agent, TranscriptSource};
use crate::conversation::{ConversationState, RunOutput};
use crate::error::Error;

/// A node of the agent's control loop.
///
/// ```text
/// PrepareInput -> Agent -> Tools -> Agent -> ... -> Output
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Moves the pending input into the history.
    PrepareInput,
    /// Asks the model for the next message.
    Agent,
    /// Answers the tool calls of the last message.
    Tools,
    /// Emits the content of the last message.
    Output,
}

/// Appends the pending input as a user message. Does nothing once the
/// input has been consumed.
pub(super) fn prepare_input(mut state: ConversationState) -> ConversationState {
    if let Some(input) = state.input_message.take() {
        state.messages.push(ModelMessage::User(input));
    }
    state
}

/// Picks the stage that follows a model turn.
pub(super) fn route(state: &ConversationState) -> Stage {
    if state.pending_tool_calls().is_empty() {
        Stage::Output
    } else {
        Stage::Tools
    }
}

pub(super) fn output(state: &ConversationState) -> RunOutput {
    RunOutput {
        result: state
            .last_message()
            .map(|msg| msg.content().to_owned())
            .unwrap_or_default(),
    }
}

impl Agent {
    pub(super) async fn call_model(
        &self,
        mut state: ConversationState,
    ) -> Result<ConversationState, Error> {
        debug_assert!(
            state.pending_tool_calls().is_empty(),
            "tool calls must be answered before calling the model again"
        );

        let request = self.build_model_request(&state);
        let resp = self
            .model_client
            .send_request(request)
            .await
            .map_err(Error::Model)?;

        if !resp.message.content.is_empty() {
            self.emit_transcript(
                &resp.message.content,
                TranscriptSource::Assistant,
            );
        }
        state.messages.push(ModelMessage::Assistant(resp.message));
        Ok(state)
    }

    pub(super) async fn run_tools(
        &self,
        mut state: ConversationState,
    ) -> ConversationState {
        // Tool results are appended right after the requesting message, so
        // the requests have to be copied out first.
        let requests = state.pending_tool_calls().to_vec();
        for req in &requests {
            self.emit_transcript(&req.name, TranscriptSource::Tool);
            let result = self.tools.dispatch(req).await;
            state.messages.push(ModelMessage::Tool(result));
        }
        state
    }

    fn build_model_request(&self, state: &ConversationState) -> ModelRequest {
        let system = self.system_prompt.iter().cloned().map(ModelMessage::System);
        ModelRequest {
            messages: system.chain(state.messages.iter().cloned()).collect(),
            tools: self.tools.definitions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use recruit_agent_model::{AssistantMessage, ToolCallRequest};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_prepare_input_is_idempotent() {
        let state = prepare_input(ConversationState::with_input("hello"));
        assert_eq!(state.input_message(), None);
        assert_eq!(state.messages(), &[ModelMessage::User("hello".to_owned())]);

        let again = prepare_input(state.clone());
        assert_eq!(again, state);
    }

    #[test]
    fn test_route() {
        let mut state = prepare_input(ConversationState::with_input("hi"));
        state.messages.push(ModelMessage::Assistant(AssistantMessage {
            content: "Hello!".to_owned(),
            tool_calls: vec![],
        }));
        assert_eq!(route(&state), Stage::Output);
        assert_eq!(output(&state).result, "Hello!");

        state.messages.push(ModelMessage::Assistant(AssistantMessage {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call_1".to_owned(),
                name: "lookup".to_owned(),
                arguments: json!({}),
            }],
        }));
        assert_eq!(route(&state), Stage::Tools);
    }
}
