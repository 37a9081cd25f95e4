mod builder;
mod stage;

use crate::conversation::{ConversationState, RunInput, RunOutput};
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::tool::Registry as ToolRegistry;
pub use builder::AgentBuilder;
pub use stage::Stage;

type TranscriptFn = Box<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// Where a transcript comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// The user input that starts the run.
    User,
    /// A reply from the model.
    Assistant,
    /// The name of a tool that is about to run.
    Tool,
}

/// An agent that answers one input per run, calling tools as the model
/// asks for them.
///
/// A run walks through the [`Stage`]s: the input is added to the history,
/// then the model and the tools take turns until the model replies without
/// asking for a tool. The agent itself holds no per-run state, so one
/// instance can serve any number of runs, concurrently or not.
pub struct Agent {
    model_client: ModelClient,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    max_turns: Option<usize>,
    on_transcript: Option<TranscriptFn>,
}

impl Agent {
    /// Runs the agent on a single input and returns the final answer.
    pub async fn invoke(&self, input: RunInput) -> Result<RunOutput, Error> {
        let (_, output) = self.run(input.into()).await?;
        Ok(output)
    }

    /// Runs the agent from the given state until the model produces a
    /// final answer.
    ///
    /// Returns the final state along with the output, so that callers can
    /// inspect the full history.
    pub async fn run(
        &self,
        state: ConversationState,
    ) -> Result<(ConversationState, RunOutput), Error> {
        let mut state = state;
        let mut stage = Stage::PrepareInput;
        let mut turns = 0;

        loop {
            debug!("entering stage {stage:?}");
            stage = match stage {
                Stage::PrepareInput => {
                    if let Some(input) = state.input_message() {
                        self.emit_transcript(input, TranscriptSource::User);
                    }
                    state = stage::prepare_input(state);
                    // A resumed state may end with unanswered tool calls.
                    if state.pending_tool_calls().is_empty() {
                        Stage::Agent
                    } else {
                        Stage::Tools
                    }
                }
                Stage::Agent => {
                    if let Some(limit) = self.max_turns {
                        if turns >= limit {
                            warn!("turn limit of {limit} reached");
                            return Err(Error::TurnLimitExceeded { limit });
                        }
                    }
                    turns += 1;
                    state = self.call_model(state).await?;
                    stage::route(&state)
                }
                Stage::Tools => {
                    state = self.run_tools(state).await;
                    Stage::Agent
                }
                Stage::Output => {
                    let output = stage::output(&state);
                    debug!("run finished after {turns} model turn(s)");
                    return Ok((state, output));
                }
            };
        }
    }

    #[inline]
    fn emit_transcript(&self, text: &str, source: TranscriptSource) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(text, source);
        }
    }
}
