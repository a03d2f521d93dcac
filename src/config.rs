//! Process configuration loaded once from the environment.

use std::time::Duration;
use thiserror::Error;

pub const ENV_DOMAIN: &str = "ATLASSIAN_DOMAIN";
pub const ENV_EMAIL: &str = "ATLASSIAN_EMAIL";
pub const ENV_CONFLUENCE_TOKEN: &str = "ATLASSIAN_CONFLUENCE_TOKEN";
pub const ENV_JIRA_TOKEN: &str = "ATLASSIAN_JIRA_TOKEN";
pub const ENV_API_TOKEN: &str = "ATLASSIAN_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "ATLASSIAN_TIMEOUT_SECS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error(
        "No API token configured: set ATLASSIAN_CONFLUENCE_TOKEN and ATLASSIAN_JIRA_TOKEN, or ATLASSIAN_API_TOKEN"
    )]
    NoToken,

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Atlassian site and credentials.
///
/// `api_token` is the legacy shared token; per-product tokens take precedence
/// over it (see [`crate::atlassian::resolve_credential`]).
#[derive(Clone)]
pub struct AtlassianConfig {
    pub domain: String,
    pub email: String,
    pub confluence_token: Option<String>,
    pub jira_token: Option<String>,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl AtlassianConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let domain = get(ENV_DOMAIN).ok_or(ConfigError::MissingVar(ENV_DOMAIN))?;
        let email = get(ENV_EMAIL).ok_or(ConfigError::MissingVar(ENV_EMAIL))?;

        let confluence_token = get(ENV_CONFLUENCE_TOKEN);
        let jira_token = get(ENV_JIRA_TOKEN);
        let api_token = get(ENV_API_TOKEN);

        if confluence_token.is_none() && jira_token.is_none() && api_token.is_none() {
            return Err(ConfigError::NoToken);
        }

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: ENV_TIMEOUT_SECS,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            domain: normalize_domain(&domain),
            email,
            confluence_token,
            jira_token,
            api_token,
            timeout,
        })
    }

    pub fn has_confluence_token(&self) -> bool {
        self.confluence_token.is_some() || self.api_token.is_some()
    }

    pub fn has_jira_token(&self) -> bool {
        self.jira_token.is_some() || self.api_token.is_some()
    }
}

impl std::fmt::Debug for AtlassianConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlassianConfig")
            .field("domain", &self.domain)
            .field("email", &self.email)
            .field("confluence_token", &self.confluence_token.as_ref().map(|_| "***"))
            .field("jira_token", &self.jira_token.as_ref().map(|_| "***"))
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `https://acme.atlassian.net/` and `acme.atlassian.net` name the same site.
fn normalize_domain(raw: &str) -> String {
    let host = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw);
    host.trim_end_matches('/').to_string()
}
