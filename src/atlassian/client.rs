//! Authenticated HTTP access to the Confluence and Jira REST APIs.

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::credentials::Credential;
use super::types::AtlassianError;
use crate::config::DEFAULT_TIMEOUT;

/// Upstream error bodies are cut to this many characters in error messages.
const ERROR_SNIPPET_LEN: usize = 200;

/// A successful (2xx) upstream response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Performs single-attempt, Basic-auth GET requests against an Atlassian site.
///
/// The client holds no credentials; every call is handed the [`Credential`]
/// for the product it targets.
#[derive(Clone)]
pub struct AtlassianClient {
    http: Client,
    timeout: Duration,
    base_url: Option<String>,
}

impl Default for AtlassianClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl AtlassianClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            timeout,
            base_url: None,
        }
    }

    /// Send requests to `base_url` instead of `https://{domain}`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Origin that requests for `credential` are sent to.
    pub fn base_url(&self, credential: &Credential) -> String {
        match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{}", credential.domain),
        }
    }

    /// GET `path` with `query` and classify the outcome.
    ///
    /// 2xx with a JSON body is success. 401/403 map to `Unauthorized`, 404 to
    /// `NotFound`, anything else to `Upstream`. There is exactly one attempt.
    pub async fn get(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse, AtlassianError> {
        let url = format!("{}{}", self.base_url(credential), path);
        tracing::debug!("GET {} as {}", url, credential.email);

        let response = self
            .http
            .get(&url)
            .basic_auth(&credential.email, Some(&credential.token))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(path, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(path, e))?;

        tracing::debug!("GET {} -> {}", path, status.as_u16());

        if status.is_success() {
            let body = serde_json::from_str(&text).map_err(|e| {
                tracing::warn!("Non-JSON body from {}: {}", path, e);
                AtlassianError::MalformedResponse(format!("{} returned invalid JSON: {}", path, e))
            })?;
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let message = error_message(&text);
        tracing::warn!("Atlassian API error ({}) for {}: {}", status, path, message);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AtlassianError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            StatusCode::NOT_FOUND => AtlassianError::NotFound(format!("{}: {}", path, message)),
            _ => AtlassianError::Upstream {
                status: Some(status.as_u16()),
                message,
            },
        })
    }

    fn transport_error(&self, path: &str, error: reqwest::Error) -> AtlassianError {
        if error.is_timeout() {
            tracing::warn!("Request to {} timed out after {:?}", path, self.timeout);
            AtlassianError::Timeout(self.timeout)
        } else {
            tracing::warn!("Request to {} failed: {}", path, error);
            AtlassianError::Upstream {
                status: None,
                message: error.to_string(),
            }
        }
    }
}

/// Pull a readable message out of an Atlassian error body.
///
/// Confluence answers `{"message": ...}`, Jira `{"errorMessages": [...]}`;
/// anything else falls back to the raw text.
fn error_message(text: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(text) {
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        if let Some(messages) = json.get("errorMessages").and_then(Value::as_array) {
            let joined: Vec<&str> = messages.iter().filter_map(Value::as_str).collect();
            if !joined.is_empty() {
                return joined.join("; ");
            }
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(ERROR_SNIPPET_LEN).collect()
}
