//! REST API client for the Runway task endpoints.
//!
//! Wraps task creation (`POST /<endpoint>`) and status retrieval
//! (`GET /tasks/{id}`) using [`reqwest`]. The [`TaskApi`] trait is the
//! capability set the pipeline depends on, so tests can substitute a
//! scripted implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::config::RunwayConfig;

/// Header carrying the pinned API version.
const VERSION_HEADER: &str = "X-Runway-Version";

/// Capability set for talking to the generation provider.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Create a task on `endpoint` and return the raw response body.
    async fn create_task(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, RunwayApiError>;

    /// Fetch the raw status document of a task.
    async fn get_task(&self, task_id: &str) -> Result<serde_json::Value, RunwayApiError>;
}

/// Errors from the Runway REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum RunwayApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Runway returned a non-2xx status code.
    #[error("Runway API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response was 2xx but its body is not valid JSON.
    #[error("Undecodable response body: {0}")]
    Decode(String),

    /// A configured value cannot be sent as an HTTP header.
    #[error("Invalid {0} header value")]
    InvalidHeader(&'static str),
}

impl RunwayApiError {
    /// HTTP status code, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            RunwayApiError::ApiError { status, .. } => Some(*status),
            RunwayApiError::Request(e) => e.status().map(|s| s.as_u16()),
            RunwayApiError::Decode(_) | RunwayApiError::InvalidHeader(_) => None,
        }
    }

    /// Raw response body, when one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            RunwayApiError::ApiError { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// HTTP client for the Runway API.
pub struct RunwayApi {
    client: reqwest::Client,
    base_url: String,
}

impl RunwayApi {
    /// Create a client with the bearer credential and version header baked
    /// into every request.
    pub fn new(config: &RunwayConfig) -> Result<Self, RunwayApiError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| RunwayApiError::InvalidHeader("Authorization"))?;
        headers.insert(AUTHORIZATION, bearer);
        let version = HeaderValue::from_str(&config.api_version)
            .map_err(|_| RunwayApiError::InvalidHeader(VERSION_HEADER))?;
        headers.insert(VERSION_HEADER, version);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self::with_client(client, config.base_url.clone()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`]; the
    /// caller is responsible for its auth headers.
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RunwayApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RunwayApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RunwayApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful response body as JSON.
    async fn parse_response(
        response: reqwest::Response,
    ) -> Result<serde_json::Value, RunwayApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| RunwayApiError::Decode(format!("{e}: {text}")))
    }
}

#[async_trait]
impl TaskApi for RunwayApi {
    async fn create_task(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, RunwayApiError> {
        let url = self.url(endpoint);
        let keys: Vec<&str> = payload
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        tracing::info!(url = %url, ?keys, "Creating Runway task");

        let response = self.client.post(&url).json(payload).send().await?;
        let body = Self::parse_response(response).await?;
        tracing::debug!(response = %body, "Runway task created");
        Ok(body)
    }

    async fn get_task(&self, task_id: &str) -> Result<serde_json::Value, RunwayApiError> {
        let response = self
            .client
            .get(self.url(&format!("tasks/{task_id}")))
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use genrelay_core::ModelCatalog;

    use super::*;

    fn config() -> RunwayConfig {
        RunwayConfig {
            api_key: "key".into(),
            api_version: "2024-11-06".into(),
            base_url: "http://localhost:9".into(),
            request_timeout: Duration::from_secs(1),
            models: ModelCatalog::default(),
        }
    }

    #[test]
    fn new_does_not_panic() {
        let _api = RunwayApi::new(&config()).unwrap();
    }

    #[test]
    fn rejects_key_with_newline() {
        let mut cfg = config();
        cfg.api_key = "bad\nkey".into();
        assert!(matches!(
            RunwayApi::new(&cfg),
            Err(RunwayApiError::InvalidHeader("Authorization"))
        ));
    }

    #[test]
    fn rejects_version_with_newline() {
        let mut cfg = config();
        cfg.api_version = "2024\n11".into();
        let err = RunwayApi::new(&cfg).err().unwrap();
        assert!(matches!(err, RunwayApiError::InvalidHeader(VERSION_HEADER)));
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), format!("Invalid {VERSION_HEADER} header value"));
    }

    #[test]
    fn urls_are_joined_with_single_slash() {
        let api = RunwayApi::new(&config()).unwrap();
        assert_eq!(api.url("tasks/abc"), "http://localhost:9/tasks/abc");
        assert_eq!(api.url("/text_to_video"), "http://localhost:9/text_to_video");
    }

    #[test]
    fn api_error_display_includes_status_and_body() {
        let err = RunwayApiError::ApiError {
            status: 400,
            body: "{\"error\":\"bad ratio\"}".into(),
        };
        assert_eq!(
            err.to_string(),
            "Runway API error (400): {\"error\":\"bad ratio\"}"
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.body(), Some("{\"error\":\"bad ratio\"}"));
    }

    #[tokio::test]
    async fn unreachable_host_is_request_error() {
        let api = RunwayApi::new(&config()).unwrap();
        let err = api.get_task("abc").await.unwrap_err();
        assert!(matches!(err, RunwayApiError::Request(_)));
    }
}
