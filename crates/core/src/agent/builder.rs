use recruit_agent_model::ModelProvider;

use super::{Agent, TranscriptSource};
use crate::model_client::ModelClient;
use crate::tool::{Registry as ToolRegistry, Tool};

const DEFAULT_MAX_TURNS: usize = 25;

/// [`Agent`] builder.
pub struct AgentBuilder {
    model_client: ModelClient,
    tools: ToolRegistry,
    system_prompt: Option<String>,
    max_turns: Option<usize>,
    on_transcript: Option<super::TranscriptFn>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tools: Default::default(),
            system_prompt: None,
            max_turns: Some(DEFAULT_MAX_TURNS),
            on_transcript: None,
        }
    }

    /// Sets the system instruction sent ahead of the history in every
    /// model request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Limits how many times the model is called in one run, 25 by
    /// default. `None` removes the limit.
    #[inline]
    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Attaches a callback to be invoked with the input, every model reply
    /// and the name of every tool that runs.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.add_tool(tool);
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent {
            model_client: self.model_client,
            tools: self.tools,
            system_prompt: self.system_prompt,
            max_turns: self.max_turns,
            on_transcript: self.on_transcript,
        }
    }
}
