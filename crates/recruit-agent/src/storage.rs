//! Access to files kept in UiPath Orchestrator storage buckets.

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::http::check_status;

/// A file inside a storage bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobLocation {
    /// Name of the bucket.
    pub bucket: String,
    /// Orchestrator folder the bucket lives in.
    pub folder: String,
    /// Path of the file inside the bucket.
    pub path: String,
}

/// Error type for [`BucketStorage`].
#[derive(Debug)]
pub enum StorageError {
    /// No bucket with the given name exists in the folder.
    BucketNotFound {
        /// The bucket name.
        bucket: String,
        /// The folder that was searched.
        folder: String,
    },
    /// The server answered with a non-success status.
    Status {
        /// The response status.
        status: StatusCode,
        /// The response body, as text.
        body: String,
    },
    /// The request could not be sent or the response not received.
    Transport(reqwest::Error),
    /// The server answered with something that could not be understood.
    InvalidResponse(String),
    /// Writing the downloaded content failed.
    Io(io::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BucketNotFound { bucket, folder } => {
                write!(f, "bucket '{bucket}' not found in folder '{folder}'")
            }
            Self::Status { status, body } => {
                write!(f, "{status}: {body}")
            }
            Self::Transport(err) => write!(f, "{err}"),
            Self::InvalidResponse(message) => {
                write!(f, "invalid response: {message}")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<(StatusCode, String)> for StorageError {
    fn from((status, body): (StatusCode, String)) -> Self {
        Self::Status { status, body }
    }
}

/// A place files can be downloaded from.
#[async_trait]
pub trait BucketStorage: Send + Sync {
    /// Downloads `blob` into a new file at `destination`.
    ///
    /// On failure the destination may have been created and partially
    /// written; removing it is up to the caller.
    async fn download(
        &self,
        blob: &BlobLocation,
        destination: &Path,
    ) -> Result<(), StorageError>;
}

/// Connection settings for [`OrchestratorBuckets`].
#[derive(Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Base URL of the Orchestrator tenant, e.g.
    /// `https://cloud.uipath.com/org/tenant/orchestrator_`.
    pub base_url: String,
    /// Bearer token used for Orchestrator requests.
    pub access_token: String,
}

impl Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ODataList<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Bucket {
    id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobFileAccess {
    uri: String,
    #[serde(default)]
    verb: Option<String>,
    #[serde(default)]
    headers: Option<KeyValues>,
    #[serde(default)]
    requires_auth: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyValues {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    values: Vec<String>,
}

/// Storage buckets served by the Orchestrator OData API.
///
/// A download resolves the bucket id by name, asks for a read URI for the
/// file, then streams the file from that URI.
#[derive(Clone, Debug)]
pub struct OrchestratorBuckets {
    http: Client,
    config: Arc<OrchestratorConfig>,
}

impl OrchestratorBuckets {
    /// Creates a storage client with the given configuration.
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            http: Client::new(),
            config: Arc::new(config),
        }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn parse_url(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Url, StorageError> {
        let url = format!("{}{path}", self.base_url());
        Url::parse_with_params(&url, params).map_err(|err| {
            StorageError::InvalidResponse(format!("bad url `{url}`: {err}"))
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        folder: &str,
    ) -> Result<T, StorageError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.access_token)
            .header("X-UIPATH-FolderPath", folder)
            .send()
            .await?;
        let text = check_status(response).await?.text().await?;
        serde_json::from_str(&text)
            .map_err(|err| StorageError::InvalidResponse(err.to_string()))
    }

    async fn find_bucket_id(
        &self,
        blob: &BlobLocation,
    ) -> Result<i64, StorageError> {
        let filter =
            format!("Name eq '{}'", blob.bucket.replace('\'', "''"));
        let url = self.parse_url(
            "/odata/Buckets",
            &[("$filter", filter.as_str()), ("$top", "1")],
        )?;

        let buckets: ODataList<Bucket> = self.get_json(url, &blob.folder).await?;
        buckets
            .value
            .first()
            .map(|bucket| bucket.id)
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: blob.bucket.clone(),
                folder: blob.folder.clone(),
            })
    }

    async fn read_access(
        &self,
        bucket_id: i64,
        blob: &BlobLocation,
    ) -> Result<BlobFileAccess, StorageError> {
        let path = format!(
            "/odata/Buckets({bucket_id})/UiPath.Server.Configuration.OData.GetReadUri"
        );
        let url = self.parse_url(&path, &[("path", blob.path.as_str())])?;
        self.get_json(url, &blob.folder).await
    }
}

#[async_trait]
impl BucketStorage for OrchestratorBuckets {
    async fn download(
        &self,
        blob: &BlobLocation,
        destination: &Path,
    ) -> Result<(), StorageError> {
        let bucket_id = self.find_bucket_id(blob).await?;
        let access = self.read_access(bucket_id, blob).await?;
        debug!("bucket '{}' has id {bucket_id}", blob.bucket);

        let method = match access.verb.as_deref() {
            Some(verb) => Method::from_bytes(verb.as_bytes()).map_err(|_| {
                StorageError::InvalidResponse(format!("bad verb `{verb}`"))
            })?,
            None => Method::GET,
        };
        let mut request = self.http.request(method, access.uri.as_str());
        if let Some(headers) = &access.headers {
            for (key, value) in headers.keys.iter().zip(&headers.values) {
                request = request.header(key.as_str(), value.as_str());
            }
        }
        if access.requires_auth {
            request = request.bearer_auth(&self.config.access_token);
        }

        let mut response = check_status(request.send().await?).await?;
        let mut file = File::create(destination).await?;
        let mut written = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        debug!("downloaded {written} bytes to {}", destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CannedResponse, TestServer};

    fn blob(bucket: &str) -> BlobLocation {
        BlobLocation {
            bucket: bucket.to_owned(),
            folder: "Shared".to_owned(),
            path: "cv/ada.txt".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_download() {
        let server = TestServer::bind().await;
        let storage = OrchestratorBuckets::new(OrchestratorConfig {
            base_url: format!("{}/", server.base_url()),
            access_token: "orch-token".to_owned(),
        });
        let read_uri = format!(
            r#"{{"Uri":"{}/blobs/ada.txt?sig=abc","Verb":"GET","RequiresAuth":false,"Headers":{{"Keys":["x-ms-blob-type"],"Values":["BlockBlob"]}}}}"#,
            server.base_url()
        );
        let requests = server.serve(vec![
            CannedResponse::json(200, r#"{"value":[{"Id":7,"Name":"GenAI"}]}"#),
            CannedResponse::json(200, read_uri),
            CannedResponse::bytes(200, "Ada Lovelace, analyst"),
        ]);

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("ada.txt");
        storage.download(&blob("GenAI"), &destination).await.unwrap();
        assert_eq!(
            tokio::fs::read_to_string(&destination).await.unwrap(),
            "Ada Lovelace, analyst"
        );

        let requests = requests.await.unwrap();
        assert_eq!(
            requests[0].target,
            "/odata/Buckets?%24filter=Name+eq+%27GenAI%27&%24top=1"
        );
        assert_eq!(requests[0].header("authorization"), Some("Bearer orch-token"));
        assert_eq!(requests[0].header("x-uipath-folderpath"), Some("Shared"));
        assert_eq!(
            requests[1].target,
            "/odata/Buckets(7)/UiPath.Server.Configuration.OData.GetReadUri?path=cv%2Fada.txt"
        );
        assert_eq!(requests[2].target, "/blobs/ada.txt?sig=abc");
        assert_eq!(requests[2].header("x-ms-blob-type"), Some("BlockBlob"));
        assert_eq!(requests[2].header("authorization"), None);
    }

    #[tokio::test]
    async fn test_unknown_bucket() {
        let server = TestServer::bind().await;
        let storage = OrchestratorBuckets::new(OrchestratorConfig {
            base_url: server.base_url().to_owned(),
            access_token: "orch-token".to_owned(),
        });
        let _requests =
            server.serve(vec![CannedResponse::json(200, r#"{"value":[]}"#)]);

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("ada.txt");
        let err = storage
            .download(&blob("Missing"), &destination)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "bucket 'Missing' not found in folder 'Shared'"
        );
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_read_uri_not_found() {
        let server = TestServer::bind().await;
        let storage = OrchestratorBuckets::new(OrchestratorConfig {
            base_url: server.base_url().to_owned(),
            access_token: "orch-token".to_owned(),
        });
        let _requests = server.serve(vec![
            CannedResponse::json(200, r#"{"value":[{"Id":7}]}"#),
            CannedResponse::json(404, r#"{"message":"File not found"}"#),
        ]);

        let dir = tempfile::tempdir().unwrap();
        let err = storage
            .download(&blob("GenAI"), &dir.path().join("ada.txt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Status { status: StatusCode::NOT_FOUND, .. }
        ));
    }

    #[tokio::test]
    async fn test_bucket_lookup_forbidden() {
        let server = TestServer::bind().await;
        let storage = OrchestratorBuckets::new(OrchestratorConfig {
            base_url: server.base_url().to_owned(),
            access_token: "expired".to_owned(),
        });
        let _requests = server.serve(vec![CannedResponse::json(
            403,
            r#"{"message":"You are not authorized!"}"#,
        )]);

        let dir = tempfile::tempdir().unwrap();
        let err = storage
            .download(&blob("GenAI"), &dir.path().join("ada.txt"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"403 Forbidden: {"message":"You are not authorized!"}"#
        );
    }
}
