//! Shared plumbing for the Confluence and Jira operations.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use super::client::AtlassianClient;
use super::credentials::{resolve_credential, Credential};
use super::types::{AtlassianError, Product};
use crate::config::AtlassianConfig;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// Entry point for every read operation.
///
/// Cheap to clone; clones share the configuration and the HTTP connection pool.
#[derive(Clone)]
pub struct AtlassianService {
    config: Arc<AtlassianConfig>,
    client: AtlassianClient,
}

impl AtlassianService {
    pub fn new(config: Arc<AtlassianConfig>) -> Self {
        let client = AtlassianClient::new(config.timeout);
        Self { config, client }
    }

    pub fn with_client(config: Arc<AtlassianConfig>, client: AtlassianClient) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &AtlassianConfig {
        &self.config
    }

    pub(crate) fn credential(&self, product: Product) -> Result<Credential, AtlassianError> {
        Ok(resolve_credential(&self.config, product)?)
    }

    /// Resolve the product credential and GET `path`. Returns the site origin
    /// alongside the body so callers can build web links.
    pub(crate) async fn fetch(
        &self,
        product: Product,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(String, Value), AtlassianError> {
        let credential = self.credential(product)?;
        let response = self.client.get(&credential, path, query).await?;
        Ok((self.client.base_url(&credential), response.body))
    }
}

/// Decode a JSON payload into its schema, reporting shape mismatches as
/// `MalformedResponse`.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, AtlassianError> {
    serde_json::from_value(value)
        .map_err(|e| AtlassianError::MalformedResponse(format!("unexpected {} shape: {}", what, e)))
}

pub(crate) fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

pub(crate) fn require_non_empty<'a>(value: &'a str, name: &str) -> Result<&'a str, AtlassianError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AtlassianError::InvalidArgument(format!("{} must not be empty", name)));
    }
    Ok(trimmed)
}
