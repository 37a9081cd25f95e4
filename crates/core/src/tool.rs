//! Tool call supports.

mod error;
mod object;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use registry::Registry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Tools are stateless from the agent's point of view: the same instance
/// serves every call, and nothing is carried from one call to the next.
/// Clients and settings a tool needs should be set up when it is created
/// and cloned into the future returned by [`Tool::execute`].
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// Returns the name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Returns the description shown to the model.
    fn description(&self) -> &str;

    /// Returns the JSON schema of [`Tool::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    ///
    /// The returned future must not borrow from `self`. Failures are
    /// returned as [`Error`]s whose reason is shown to the model, so the
    /// reason should be understandable without further context.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
