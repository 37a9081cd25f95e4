use recruit_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::traffit::{TraffitClient, TraffitError};

/// Input of [`TraffitCandidateTool`].
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CandidateParameters {
    #[schemars(description = "The numerical ID of the candidate to search for.")]
    candidate_id: u64,
}

/// A tool that looks up a candidate record in Traffit.
pub struct TraffitCandidateTool {
    client: TraffitClient,
    parameter_schema: Value,
}

impl TraffitCandidateTool {
    /// Creates the tool on top of the given client.
    pub fn new(client: TraffitClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(CandidateParameters).to_value(),
        }
    }
}

impl Tool for TraffitCandidateTool {
    type Input = CandidateParameters;

    fn name(&self) -> &str {
        "get_traffit_candidate_data"
    }

    fn description(&self) -> &str {
        r#"
Fetches data for a specific candidate from the Traffit system using their ID.
Use this tool when the user asks to find, get, or search for a candidate in Traffit."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CandidateParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            info!("fetching Traffit candidate {}", input.candidate_id);
            let record = client
                .fetch_candidate(input.candidate_id)
                .await
                .map_err(|err| {
                    warn!("candidate lookup failed: {err}");
                    let reason = match err {
                        TraffitError::Status { .. } => err.to_string(),
                        _ => format!("An unexpected error occurred: {err}"),
                    };
                    ToolError::execution_error().with_reason(reason)
                })?;

            serde_json::to_string_pretty(&record).map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("An unexpected error occurred: {err}"))
            })
        }
    }
}
