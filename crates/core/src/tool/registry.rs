use std::collections::BTreeMap;

use recruit_agent_model::{ModelTool, ToolCallRequest, ToolCallResult};

use crate::tool::object::{ToolObject, ToolObjectImpl};
use crate::tool::{Error, Tool};

/// The set of tools the model may call, keyed by name.
#[derive(Default)]
pub struct Registry {
    tools: BTreeMap<String, Box<dyn ToolObject>>,
}

impl Registry {
    /// Registers a tool, replacing any tool with the same name.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        if self
            .tools
            .insert(name, Box::new(ToolObjectImpl(tool)))
            .is_some()
        {
            warn!("a tool was registered twice, keeping the last one");
        }
    }

    /// Returns the declarations of all tools, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Runs one tool call and turns its outcome into a result message.
    ///
    /// Every request gets a result, including the ones naming an unknown
    /// tool or carrying malformed arguments.
    pub async fn dispatch(&self, req: &ToolCallRequest) -> ToolCallResult {
        let outcome = match self.tools.get(&req.name) {
            Some(tool) => {
                trace!("running {} ({}): {}", req.name, req.id, req.arguments);
                tool.execute(req.arguments.clone()).await
            }
            None => Err(Error::not_found()
                .with_reason(format!("Tool `{}` is not available", req.name))),
        };

        let content = match outcome {
            Ok(content) => content,
            Err(err) => {
                warn!("tool {} ({}) failed: {err}", req.name, req.id);
                err.to_string()
            }
        };
        ToolCallResult {
            id: req.id.clone(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;
    use std::sync::LazyLock;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::ToolResult;

    static SCHEMA: LazyLock<Value> = LazyLock::new(|| {
        json!({
            "type": "object",
            "properties": { "word": { "type": "string" } },
            "required": ["word"]
        })
    });

    #[derive(Deserialize)]
    struct ShoutInput {
        word: String,
    }

    struct ShoutTool;

    impl Tool for ShoutTool {
        type Input = ShoutInput;

        fn name(&self) -> &str {
            "shout"
        }

        fn description(&self) -> &str {
            "Upper-cases a word"
        }

        fn parameter_schema(&self) -> &Value {
            &SCHEMA
        }

        fn execute(
            &self,
            input: ShoutInput,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(if input.word.is_empty() {
                Err(Error::execution_error().with_reason("Nothing to shout"))
            } else {
                Ok(input.word.to_uppercase())
            })
        }
    }

    fn request(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_definitions() {
        let mut registry = Registry::default();
        registry.add_tool(ShoutTool);
        let definitions = registry.definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "shout");
        assert_eq!(definitions[0].parameters, *SCHEMA);
    }

    #[tokio::test]
    async fn test_dispatch() {
        let mut registry = Registry::default();
        registry.add_tool(ShoutTool);

        let result = registry
            .dispatch(&request("shout", json!({ "word": "hey" })))
            .await;
        assert_eq!(result.id, "call_1");
        assert_eq!(result.content, "HEY");

        let result = registry
            .dispatch(&request("shout", json!({ "word": "" })))
            .await;
        assert_eq!(result.content, "Nothing to shout");
    }

    #[tokio::test]
    async fn test_dispatch_failures_still_answer() {
        let mut registry = Registry::default();
        registry.add_tool(ShoutTool);

        let result = registry.dispatch(&request("whisper", json!({}))).await;
        assert_eq!(result.id, "call_1");
        assert_eq!(result.content, "Tool `whisper` is not available");

        let result = registry
            .dispatch(&request("shout", json!({ "word": 3 })))
            .await;
        assert_eq!(result.id, "call_1");
        assert!(
            result.content.starts_with("Invalid arguments for `shout`"),
            "{}",
            result.content
        );
    }

    #[tokio::test]
    async fn test_unparsed_arguments_are_answered() {
        let mut registry = Registry::default();
        registry.add_tool(ShoutTool);

        // Arguments the provider could not parse arrive as the raw text.
        let result = registry
            .dispatch(&request("shout", Value::String("{\"word\": \"he".to_owned())))
            .await;
        assert_eq!(result.id, "call_1");
        assert!(
            result.content.starts_with("Invalid arguments for `shout`"),
            "{}",
            result.content
        );
    }
}
