//! Confluence read operations

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::resolver::{confluence_page_id, is_page_id};
use super::service::{
    clamp_limit, decode, require_non_empty, AtlassianService, DEFAULT_LIST_LIMIT,
    DEFAULT_SEARCH_LIMIT,
};
use super::types::{AtlassianError, ConfluencePage, ConfluenceSpace, Product};

const CONTENT_PATH: &str = "/wiki/rest/api/content";
const SEARCH_PATH: &str = "/wiki/rest/api/content/search";
const SPACE_PATH: &str = "/wiki/rest/api/space";

const PAGE_EXPAND: &str = "body.storage,space,version,ancestors";
const SEARCH_EXPAND: &str = "space,version";
const SPACE_EXPAND: &str = "description.plain,homepage";

/// `field op ...` at the start of the query, optionally behind opening
/// parentheses or `NOT`, means the caller wrote CQL.
static CQL_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\(\s*|not\s+)*[a-z][a-z0-9_.]*\s*(!=|!~|>=|<=|=|~|>|<|\bnot\s+in\s*\(|\bin\s*\()",
    )
    .expect("valid CQL clause regex")
});

#[derive(Deserialize)]
struct RawContent {
    id: String,
    #[serde(rename = "type")]
    content_type: String,
    title: String,
    status: Option<String>,
    space: Option<RawSpaceRef>,
    version: Option<RawVersion>,
    #[serde(default)]
    ancestors: Vec<RawAncestor>,
    body: Option<RawBody>,
    #[serde(rename = "_links")]
    links: Option<RawLinks>,
}

#[derive(Deserialize)]
struct RawSpaceRef {
    key: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawVersion {
    number: Option<u64>,
    when: Option<String>,
    by: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawUser {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RawAncestor {
    title: String,
}

#[derive(Deserialize)]
struct RawBody {
    storage: Option<RawStorage>,
}

#[derive(Deserialize)]
struct RawStorage {
    value: String,
}

#[derive(Deserialize)]
struct RawLinks {
    webui: Option<String>,
}

#[derive(Deserialize)]
struct RawResults<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct RawSpace {
    id: i64,
    key: String,
    name: String,
    #[serde(rename = "type")]
    space_type: Option<String>,
    status: Option<String>,
    description: Option<RawSpaceDescription>,
    homepage: Option<RawHomepage>,
    #[serde(rename = "_links")]
    links: Option<RawLinks>,
}

#[derive(Deserialize)]
struct RawSpaceDescription {
    plain: Option<RawPlain>,
}

#[derive(Deserialize)]
struct RawPlain {
    value: String,
}

#[derive(Deserialize)]
struct RawHomepage {
    id: String,
}

fn web_url(base: &str, links: Option<RawLinks>) -> Option<String> {
    links
        .and_then(|l| l.webui)
        .map(|webui| format!("{}/wiki{}", base, webui))
}

impl RawContent {
    fn normalize(self, base: &str) -> ConfluencePage {
        let (version, last_updated_by, updated) = match self.version {
            Some(v) => (v.number, v.by.and_then(|u| u.display_name), v.when),
            None => (None, None, None),
        };
        let (space_key, space_name) = match self.space {
            Some(s) => (Some(s.key), s.name),
            None => (None, None),
        };

        ConfluencePage {
            id: self.id,
            title: self.title,
            content_type: self.content_type,
            status: self.status,
            space_key,
            space_name,
            version,
            last_updated_by,
            updated,
            ancestors: self.ancestors.into_iter().map(|a| a.title).collect(),
            body: self.body.and_then(|b| b.storage).map(|s| s.value),
            url: web_url(base, self.links),
        }
    }
}

impl RawSpace {
    fn normalize(self, base: &str) -> ConfluenceSpace {
        ConfluenceSpace {
            id: self.id,
            key: self.key,
            name: self.name,
            space_type: self.space_type,
            status: self.status,
            description: self
                .description
                .and_then(|d| d.plain)
                .map(|p| p.value)
                .filter(|v| !v.trim().is_empty()),
            homepage_id: self.homepage.map(|h| h.id),
            url: web_url(base, self.links),
        }
    }
}

/// Turn a search box query into CQL. Input that already starts with a CQL
/// clause is passed through untouched.
pub fn to_cql(query: &str) -> String {
    let query = query.trim();
    if CQL_CLAUSE.is_match(query) {
        return query.to_string();
    }
    let escaped = query.replace('\\', "\\\\").replace('"', "\\\"");
    format!("text ~ \"{}\" AND type = page", escaped)
}

impl AtlassianService {
    pub async fn confluence_get_page(&self, page_id: &str) -> Result<ConfluencePage, AtlassianError> {
        let page_id = require_non_empty(page_id, "page_id")?;
        if !is_page_id(page_id) {
            return Err(AtlassianError::InvalidArgument(format!(
                "page_id must be numeric, got {}",
                page_id
            )));
        }
        let path = format!("{}/{}", CONTENT_PATH, page_id);
        let (base, body) = self
            .fetch(
                Product::Confluence,
                &path,
                &[("expand", PAGE_EXPAND.to_string())],
            )
            .await?;

        let raw: RawContent = decode(body, "Confluence page")?;
        Ok(raw.normalize(&base))
    }

    pub async fn confluence_get_page_by_url(&self, url: &str) -> Result<ConfluencePage, AtlassianError> {
        let page_id = confluence_page_id(url).ok_or_else(|| {
            AtlassianError::UnsupportedUrl(format!("not a recognized Confluence page URL: {}", url))
        })?;
        tracing::debug!("Resolved {} to page {}", url, page_id);
        self.confluence_get_page(&page_id).await
    }

    /// Search pages by CQL or free text. Results keep the upstream order.
    pub async fn confluence_search_pages(
        &self,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<ConfluencePage>, AtlassianError> {
        let query = require_non_empty(query, "query")?;
        let cql = to_cql(query);
        let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT);
        tracing::debug!("Confluence search: {}", cql);

        let (base, body) = self
            .fetch(
                Product::Confluence,
                SEARCH_PATH,
                &[
                    ("cql", cql),
                    ("limit", limit.to_string()),
                    ("expand", SEARCH_EXPAND.to_string()),
                ],
            )
            .await?;

        let raw: RawResults<RawContent> = decode(body, "Confluence search result")?;
        Ok(raw.results.into_iter().map(|c| c.normalize(&base)).collect())
    }

    pub async fn confluence_list_spaces(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<ConfluenceSpace>, AtlassianError> {
        let limit = clamp_limit(limit, DEFAULT_LIST_LIMIT);
        let (base, body) = self
            .fetch(
                Product::Confluence,
                SPACE_PATH,
                &[
                    ("limit", limit.to_string()),
                    ("expand", SPACE_EXPAND.to_string()),
                ],
            )
            .await?;

        let raw: RawResults<RawSpace> = decode(body, "Confluence space list")?;
        Ok(raw.results.into_iter().map(|s| s.normalize(&base)).collect())
    }
}
