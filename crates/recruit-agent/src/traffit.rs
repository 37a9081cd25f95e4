//! A client for the Traffit recruiting API.
//!
//! Every lookup requests a fresh access token with the client credentials
//! grant, then reads the employee record with it. Tokens are not cached.

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::check_status;

/// The Traffit instance used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://mindboxgroup.traffit.com";

/// The OAuth client id used when none is configured.
pub const DEFAULT_CLIENT_ID: &str = "mindboxgroup_CVtagv2";

const SCOPES: &[&str] = &[
    "employee",
    "file",
    "advert",
    "advert_publish",
    "client",
    "crm_activity",
    "crm_person",
    "form",
    "message",
    "provision",
    "recruitment",
    "talent",
    "user",
    "webhook",
    "workflow",
    "source",
    "dictionary",
];

/// Returns the space separated scope list sent with token requests.
pub fn scope() -> String {
    SCOPES.join(" ")
}

/// Connection settings for [`TraffitClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct TraffitConfig {
    /// Base URL of the Traffit instance, without a trailing slash.
    pub base_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl TraffitConfig {
    /// Creates a configuration for the default instance and client id.
    pub fn with_client_secret<S: Into<String>>(client_secret: S) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            client_secret: client_secret.into(),
        }
    }
}

impl Debug for TraffitConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraffitConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Error type for [`TraffitClient`].
#[derive(Debug)]
pub enum TraffitError {
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
}

impl Display for TraffitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, body } => {
                write!(f, "HTTP error occurred: {status} - Response: {body}")
            }
            Self::Transport(err) => write!(f, "{err}"),
            Self::InvalidResponse(message) => {
                write!(f, "invalid response: {message}")
            }
        }
    }
}

impl StdError for TraffitError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TraffitError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

impl From<(StatusCode, String)> for TraffitError {
    fn from((status, body): (StatusCode, String)) -> Self {
        Self::Status { status, body }
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// A Traffit API client. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct TraffitClient {
    http: Client,
    config: Arc<TraffitConfig>,
}

impl TraffitClient {
    /// Creates a client with the given configuration.
    pub fn new(config: TraffitConfig) -> Self {
        Self {
            http: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Requests a new access token.
    pub async fn request_token(&self) -> Result<String, TraffitError> {
        let url = format!("{}/oauth2/token", self.base_url());
        let body = TokenRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            grant_type: "client_credentials",
            scope: scope(),
        };

        debug!("requesting Traffit access token");
        let response = self.http.post(url).json(&body).send().await?;
        let text = check_status(response).await?.text().await?;
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|err| TraffitError::InvalidResponse(err.to_string()))?;
        Ok(token.access_token)
    }

    /// Reads an employee record with an existing token.
    pub async fn fetch_employee(
        &self,
        employee_id: u64,
        token: &str,
    ) -> Result<Value, TraffitError> {
        let url = format!(
            "{}/api/integration/v2/employees/{employee_id}",
            self.base_url()
        );

        debug!("fetching Traffit employee {employee_id}");
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let text = check_status(response).await?.text().await?;
        serde_json::from_str(&text)
            .map_err(|err| TraffitError::InvalidResponse(err.to_string()))
    }

    /// Requests a token and reads the candidate record with it.
    pub async fn fetch_candidate(
        &self,
        candidate_id: u64,
    ) -> Result<Value, TraffitError> {
        let token = self.request_token().await?;
        self.fetch_employee(candidate_id, &token).await
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{CannedResponse, TestServer};

    fn client_for(base_url: &str) -> TraffitClient {
        TraffitClient::new(TraffitConfig {
            base_url: format!("{base_url}/"),
            client_id: "client".to_owned(),
            client_secret: "secret".to_owned(),
        })
    }

    #[test]
    fn test_scope_is_space_separated() {
        let scope = scope();
        assert!(scope.starts_with("employee file advert "));
        assert!(!scope.contains(','));
        assert_eq!(scope.split(' ').count(), SCOPES.len());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = TraffitConfig::with_client_secret("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains(DEFAULT_CLIENT_ID));
    }

    #[tokio::test]
    async fn test_fetch_candidate() {
        let server = TestServer::bind().await;
        let client = client_for(server.base_url());
        let requests = server.serve(vec![
            CannedResponse::json(200, r#"{"access_token":"tok","expires_in":3600}"#),
            CannedResponse::json(200, r#"{"id":42,"name":"Ada"}"#),
        ]);

        let employee = client.fetch_candidate(42).await.unwrap();
        assert_eq!(employee, json!({ "id": 42, "name": "Ada" }));

        let requests = requests.await.unwrap();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/oauth2/token");
        let token_body: Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(
            token_body,
            json!({
                "client_id": "client",
                "client_secret": "secret",
                "grant_type": "client_credentials",
                "scope": scope(),
            })
        );
        assert_eq!(requests[1].method, "GET");
        assert_eq!(requests[1].target, "/api/integration/v2/employees/42");
        assert_eq!(requests[1].header("authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_token_rejected() {
        let server = TestServer::bind().await;
        let client = client_for(server.base_url());
        let requests = server.serve(vec![CannedResponse::json(
            401,
            r#"{"error":"invalid_client"}"#,
        )]);

        let err = client.fetch_candidate(42).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"HTTP error occurred: 401 Unauthorized - Response: {"error":"invalid_client"}"#
        );
        // No employee request without a token.
        assert_eq!(requests.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_missing_from_response() {
        let server = TestServer::bind().await;
        let client = client_for(server.base_url());
        let _requests =
            server.serve(vec![CannedResponse::json(200, r#"{"token":"x"}"#)]);

        let err = client.request_token().await.unwrap_err();
        assert!(matches!(err, TraffitError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_lookup() {
        let server = TestServer::bind().await;
        let client = client_for(server.base_url());
        let _requests = server.serve(vec![
            CannedResponse::json(200, r#"{"access_token":"tok"}"#),
            CannedResponse::json(429, r#"{"error":"slow down"}"#),
        ]);

        let err = client.fetch_candidate(42).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"HTTP error occurred: 429 Too Many Requests - Response: {"error":"slow down"}"#
        );
    }
}
