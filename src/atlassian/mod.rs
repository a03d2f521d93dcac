//! Atlassian integration module
//!
//! Read-only access to Confluence and Jira over their REST APIs with Basic
//! auth API tokens. URL resolution and credential selection are pure and
//! testable without the network; all HTTP goes through [`AtlassianClient`].

mod client;
mod confluence;
mod credentials;
mod jira;
mod resolver;
mod service;
mod types;

pub use client::{ApiResponse, AtlassianClient};
pub use confluence::to_cql;
pub use credentials::{resolve_credential, Credential};
pub use jira::adf_to_text;
pub use resolver::{confluence_page_id, jira_issue_key, resolve, ResourceRef};
pub use service::{AtlassianService, DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT, MAX_LIMIT};
pub use types::{
    AtlassianError, ConfluencePage, ConfluenceSpace, FailureKind, JiraIssue, JiraProject,
    MissingCredential, Product,
};
