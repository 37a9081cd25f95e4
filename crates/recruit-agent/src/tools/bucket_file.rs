use std::path::Path;
use std::sync::Arc;

use recruit_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use crate::storage::{BlobLocation, BucketStorage};

/// Input of [`DownloadBucketFileTool`].
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BucketFileParameters {
    #[schemars(
        description = "The name of the file to download (e.g., 'test.txt')."
    )]
    file_path: String,
    #[serde(default = "default_bucket_name")]
    #[schemars(description = "The name of the storage bucket.")]
    bucket_name: String,
    #[serde(default = "default_orchestrator_folder")]
    #[schemars(description = "The folder path in Orchestrator.")]
    orchestrator_folder: String,
}

fn default_bucket_name() -> String {
    "GenAI".to_owned()
}

fn default_orchestrator_folder() -> String {
    "Shared".to_owned()
}

/// A tool that downloads a text file from a storage bucket and returns its
/// content.
///
/// Each download goes to a fresh temporary directory that is removed once
/// the call finishes, whether it succeeded or not.
pub struct DownloadBucketFileTool {
    storage: Arc<dyn BucketStorage>,
    parameter_schema: Value,
}

impl DownloadBucketFileTool {
    /// Creates the tool on top of the given storage.
    pub fn new(storage: Arc<dyn BucketStorage>) -> Self {
        Self {
            storage,
            parameter_schema: schema_for!(BucketFileParameters).to_value(),
        }
    }
}

impl Tool for DownloadBucketFileTool {
    type Input = BucketFileParameters;

    fn name(&self) -> &str {
        "download_file_from_uipath_bucket"
    }

    fn description(&self) -> &str {
        r#"
Downloads a file from a specified UiPath Storage Bucket and returns its content.
Use this tool when the user asks to read, get, or download a file."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: BucketFileParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let storage = Arc::clone(&self.storage);
        async move {
            let blob = BlobLocation {
                bucket: input.bucket_name,
                folder: input.orchestrator_folder,
                path: input.file_path,
            };
            info!(
                "downloading '{}' from bucket '{}' in '{}'",
                blob.path, blob.bucket, blob.folder
            );

            match read_blob(storage.as_ref(), &blob).await {
                Ok(content) => Ok(format!(
                    "Successfully read file '{}'. Content: {content}",
                    blob.path
                )),
                Err(reason) => {
                    warn!("download of '{}' failed: {reason}", blob.path);
                    Err(ToolError::execution_error()
                        .with_reason(format!("Error downloading file: {reason}")))
                }
            }
        }
    }
}

async fn read_blob(
    storage: &dyn BucketStorage,
    blob: &BlobLocation,
) -> Result<String, String> {
    // Removed on drop, on every path out of this function.
    let dir = tempfile::Builder::new()
        .prefix("recruit-agent-")
        .tempdir()
        .map_err(|err| err.to_string())?;
    let destination = dir.path().join(local_file_name(&blob.path));

    storage
        .download(blob, &destination)
        .await
        .map_err(|err| err.to_string())?;
    let bytes = tokio::fs::read(&destination)
        .await
        .map_err(|err| err.to_string())?;
    String::from_utf8(bytes)
        .map_err(|_| "file content is not valid UTF-8".to_owned())
}

fn local_file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download")
}
