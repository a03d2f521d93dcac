//! Atlassian data types and error definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The two Atlassian products the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Confluence,
    Jira,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Product::Confluence => f.write_str("Confluence"),
            Product::Jira => f.write_str("Jira"),
        }
    }
}

/// What a credential lookup found missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingCredential {
    /// No product token and no legacy token.
    Token(Product),
    /// A shared field (`domain` or `email`) is blank.
    Field(&'static str),
}

impl fmt::Display for MissingCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingCredential::Token(product) => write!(f, "no API token configured for {}", product),
            MissingCredential::Field(field) => write!(f, "{} is not configured", field),
        }
    }
}

/// Stable, machine-readable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedUrl,
    MissingCredential,
    InvalidArgument,
    Unauthorized,
    NotFound,
    Timeout,
    MalformedResponse,
    UpstreamError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnsupportedUrl => "unsupported_url",
            FailureKind::MissingCredential => "missing_credential",
            FailureKind::InvalidArgument => "invalid_argument",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::NotFound => "not_found",
            FailureKind::Timeout => "timeout",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::UpstreamError => "upstream_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AtlassianError {
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Missing credential: {0}")]
    MissingCredential(MissingCredential),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{}", upstream_message(.status, .message))]
    Upstream { status: Option<u16>, message: String },
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Upstream error (HTTP {}): {}", status, message),
        None => format!("Upstream error: {}", message),
    }
}

impl AtlassianError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AtlassianError::UnsupportedUrl(_) => FailureKind::UnsupportedUrl,
            AtlassianError::MissingCredential(_) => FailureKind::MissingCredential,
            AtlassianError::InvalidArgument(_) => FailureKind::InvalidArgument,
            AtlassianError::Unauthorized { .. } => FailureKind::Unauthorized,
            AtlassianError::NotFound(_) => FailureKind::NotFound,
            AtlassianError::Timeout(_) => FailureKind::Timeout,
            AtlassianError::MalformedResponse(_) => FailureKind::MalformedResponse,
            AtlassianError::Upstream { .. } => FailureKind::UpstreamError,
        }
    }

    /// HTTP status of the upstream response, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AtlassianError::Unauthorized { status, .. } => Some(*status),
            AtlassianError::NotFound(_) => Some(404),
            AtlassianError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<MissingCredential> for AtlassianError {
    fn from(missing: MissingCredential) -> Self {
        AtlassianError::MissingCredential(missing)
    }
}

/// A Confluence page reduced to the fields an agent needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluencePage {
    pub id: String,
    pub title: String,
    pub content_type: String,
    pub status: Option<String>,
    pub space_key: Option<String>,
    pub space_name: Option<String>,
    pub version: Option<u64>,
    pub last_updated_by: Option<String>,
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<String>,
    /// Storage-format (XHTML) body. Search results carry no body.
    pub body: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceSpace {
    pub id: i64,
    pub key: String,
    pub name: String,
    pub space_type: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub homepage_id: Option<String>,
    pub url: Option<String>,
}

/// A Jira issue with its description flattened to plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub project_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraProject {
    pub id: String,
    pub key: String,
    pub name: String,
    pub project_type: Option<String>,
    pub lead: Option<String>,
    pub description: Option<String>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AtlassianError::UnsupportedUrl("x".into()).kind(),
            FailureKind::UnsupportedUrl
        );
        assert_eq!(AtlassianError::Timeout(Duration::from_secs(30)).kind(), FailureKind::Timeout);
        assert_eq!(
            AtlassianError::from(MissingCredential::Token(Product::Jira)).kind(),
            FailureKind::MissingCredential
        );
        assert_eq!(
            AtlassianError::Upstream { status: Some(502), message: "bad gateway".into() }.kind(),
            FailureKind::UpstreamError
        );
    }

    #[test]
    fn test_http_status() {
        let err = AtlassianError::Unauthorized { status: 403, message: "nope".into() };
        assert_eq!(err.http_status(), Some(403));
        assert_eq!(AtlassianError::NotFound("page 1".into()).http_status(), Some(404));
        assert_eq!(AtlassianError::Timeout(Duration::from_secs(30)).http_status(), None);
        let err = AtlassianError::Upstream { status: None, message: "connection refused".into() };
        assert_eq!(err.http_status(), None);
    }

    #[test]
    fn test_atlassian_error_display() {
        let err = AtlassianError::from(MissingCredential::Token(Product::Confluence));
        assert_eq!(
            err.to_string(),
            "Missing credential: no API token configured for Confluence"
        );

        let err = AtlassianError::from(MissingCredential::Field("email"));
        assert_eq!(err.to_string(), "Missing credential: email is not configured");

        let err = AtlassianError::Upstream { status: Some(500), message: "boom".into() };
        assert_eq!(err.to_string(), "Upstream error (HTTP 500): boom");

        let err = AtlassianError::Upstream { status: None, message: "dns".into() };
        assert_eq!(err.to_string(), "Upstream error: dns");
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::MalformedResponse).unwrap();
        assert_eq!(json, "\"malformed_response\"");
        assert_eq!(FailureKind::NotFound.to_string(), "not_found");
    }

    #[test]
    fn test_jira_issue_skips_empty_labels() {
        let issue = JiraIssue {
            id: "10001".into(),
            key: "TEST-1".into(),
            summary: "Fix the bug".into(),
            status: Some("Open".into()),
            issue_type: None,
            priority: None,
            assignee: None,
            reporter: None,
            project_key: Some("TEST".into()),
            labels: Vec::new(),
            created: None,
            updated: None,
            description: None,
            url: "https://test.atlassian.net/browse/TEST-1".into(),
        };

        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("labels").is_none());
        assert_eq!(json["key"], "TEST-1");
    }
}
