use std::sync::Arc;

use recruit_agent_core::{
    Agent, AgentBuilder, Error, RunInput, RunOutput, TranscriptSource,
};
use recruit_agent_model::ModelProvider;
use recruit_agent_openai_model::OpenAIProvider;

use crate::config::Config;
use crate::storage::{BucketStorage, OrchestratorBuckets};
use crate::tools::*;
use crate::traffit::TraffitClient;

const SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    storage: Option<Arc<dyn BucketStorage>>,
    traffit: Option<TraffitClient>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider and the
    /// default system prompt. No tools are attached yet.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider)
            .with_system_prompt(SYSTEM_PROMPT.trim());
        Self {
            agent_builder,
            storage: None,
            traffit: None,
        }
    }

    /// Creates a session builder with the OpenAI provider and both tools,
    /// all set up from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_model_provider(OpenAIProvider::new(config.openai.clone()))
            .with_storage(OrchestratorBuckets::new(config.orchestrator.clone()))
            .with_traffit_client(TraffitClient::new(config.traffit.clone()))
            .with_max_turns(config.max_turns)
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Enables the bucket file tool on top of `storage`.
    #[inline]
    pub fn with_storage(
        mut self,
        storage: impl BucketStorage + 'static,
    ) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Enables the candidate lookup tool on top of `client`.
    #[inline]
    pub fn with_traffit_client(mut self, client: TraffitClient) -> Self {
        self.traffit = Some(client);
        self
    }

    /// Limits how many times the model is called in one run.
    #[inline]
    pub fn with_max_turns(mut self, max_turns: Option<usize>) -> Self {
        self.agent_builder = self.agent_builder.with_max_turns(max_turns);
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.agent_builder = self.agent_builder.on_transcript(on_transcript);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let mut agent_builder = self.agent_builder;
        if let Some(storage) = self.storage {
            agent_builder =
                agent_builder.with_tool(DownloadBucketFileTool::new(storage));
        }
        if let Some(client) = self.traffit {
            agent_builder =
                agent_builder.with_tool(TraffitCandidateTool::new(client));
        }

        Session {
            agent: agent_builder.build(),
        }
    }
}

/// A fully configured agent, ready to answer recruiting questions.
///
/// It is basically a wrapper around [`Agent`]. Runs are independent of
/// each other.
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Answers one input.
    #[inline]
    pub async fn invoke(&self, input: RunInput) -> Result<RunOutput, Error> {
        self.agent.invoke(input).await
    }

    /// Answers one message and returns the answer text.
    pub async fn ask(&self, message: &str) -> Result<String, Error> {
        let output = self
            .invoke(RunInput {
                input_message: message.to_owned(),
            })
            .await?;
        Ok(output.result)
    }
}
