//! Jira read operations

use serde::Deserialize;
use serde_json::Value;

use super::resolver::{is_issue_key, jira_issue_key};
use super::service::{clamp_limit, decode, require_non_empty, AtlassianService, DEFAULT_SEARCH_LIMIT};
use super::types::{AtlassianError, JiraIssue, JiraProject, Product};

const ISSUE_PATH: &str = "/rest/api/3/issue";
const SEARCH_PATH: &str = "/rest/api/3/search";
const PROJECT_PATH: &str = "/rest/api/3/project";

const ISSUE_FIELDS: &str =
    "summary,status,issuetype,priority,assignee,reporter,project,labels,created,updated,description";
const PROJECT_EXPAND: &str = "description,lead";

#[derive(Deserialize)]
struct RawIssue {
    id: String,
    key: String,
    fields: RawIssueFields,
}

#[derive(Deserialize)]
struct RawIssueFields {
    summary: String,
    status: Option<RawNamed>,
    issuetype: Option<RawNamed>,
    priority: Option<RawNamed>,
    assignee: Option<RawUser>,
    reporter: Option<RawUser>,
    project: Option<RawProjectRef>,
    #[serde(default)]
    labels: Vec<String>,
    created: Option<String>,
    updated: Option<String>,
    description: Option<Value>,
}

#[derive(Deserialize)]
struct RawNamed {
    name: String,
}

#[derive(Deserialize)]
struct RawUser {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RawProjectRef {
    key: String,
}

#[derive(Deserialize)]
struct RawIssueSearch {
    issues: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawProject {
    id: String,
    key: String,
    name: String,
    #[serde(rename = "projectTypeKey")]
    project_type: Option<String>,
    lead: Option<RawUser>,
    description: Option<String>,
}

impl RawIssue {
    fn normalize(self, base: &str) -> JiraIssue {
        let fields = self.fields;
        let description = fields
            .description
            .as_ref()
            .map(adf_to_text)
            .filter(|text| !text.is_empty());

        JiraIssue {
            url: format!("{}/browse/{}", base, self.key),
            id: self.id,
            key: self.key,
            summary: fields.summary,
            status: fields.status.map(|s| s.name),
            issue_type: fields.issuetype.map(|t| t.name),
            priority: fields.priority.map(|p| p.name),
            assignee: fields.assignee.and_then(|u| u.display_name),
            reporter: fields.reporter.and_then(|u| u.display_name),
            project_key: fields.project.map(|p| p.key),
            labels: fields.labels,
            created: fields.created,
            updated: fields.updated,
            description,
        }
    }
}

impl RawProject {
    fn normalize(self, base: &str) -> JiraProject {
        JiraProject {
            url: format!("{}/browse/{}", base, self.key),
            id: self.id,
            key: self.key,
            name: self.name,
            project_type: self.project_type,
            lead: self.lead.and_then(|u| u.display_name),
            description: self.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// Flatten an Atlassian Document Format tree to plain text.
///
/// Block nodes end with a newline, list items get a `- ` prefix. A plain
/// string (API v2 descriptions) is returned as is.
pub fn adf_to_text(node: &Value) -> String {
    let mut out = String::new();
    write_adf(node, &mut out);
    out.trim().to_string()
}

fn write_adf(node: &Value, out: &mut String) {
    match node {
        Value::String(text) => out.push_str(text),
        Value::Array(items) => items.iter().for_each(|item| write_adf(item, out)),
        Value::Object(map) => {
            let node_type = map.get("type").and_then(Value::as_str).unwrap_or_default();
            let attr = |name: &str| map.get("attrs").and_then(|a| a.get(name)).and_then(Value::as_str);

            match node_type {
                "text" => out.push_str(map.get("text").and_then(Value::as_str).unwrap_or_default()),
                "hardBreak" => out.push('\n'),
                "mention" => out.push_str(attr("text").unwrap_or_default()),
                "emoji" => out.push_str(attr("text").or_else(|| attr("shortName")).unwrap_or_default()),
                "inlineCard" | "blockCard" => out.push_str(attr("url").unwrap_or_default()),
                "listItem" => out.push_str("- "),
                _ => {}
            }

            if let Some(content) = map.get("content") {
                write_adf(content, out);
            }

            if is_block(node_type) && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        _ => {}
    }
}

fn is_block(node_type: &str) -> bool {
    matches!(
        node_type,
        "paragraph" | "heading" | "codeBlock" | "blockquote" | "rule" | "tableRow" | "panel"
            | "blockCard" | "mediaSingle"
    )
}

impl AtlassianService {
    pub async fn jira_get_issue(&self, issue_key: &str) -> Result<JiraIssue, AtlassianError> {
        let issue_key = require_non_empty(issue_key, "issue_key")?;
        if !is_issue_key(issue_key) && !issue_key.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AtlassianError::InvalidArgument(format!(
                "issue_key must look like PROJ-123, got {}",
                issue_key
            )));
        }

        let path = format!("{}/{}", ISSUE_PATH, issue_key);
        let (base, body) = self
            .fetch(Product::Jira, &path, &[("fields", ISSUE_FIELDS.to_string())])
            .await?;

        let raw: RawIssue = decode(body, "Jira issue")?;
        Ok(raw.normalize(&base))
    }

    pub async fn jira_get_issue_by_url(&self, url: &str) -> Result<JiraIssue, AtlassianError> {
        let issue_key = jira_issue_key(url).ok_or_else(|| {
            AtlassianError::UnsupportedUrl(format!("not a recognized Jira issue URL: {}", url))
        })?;
        tracing::debug!("Resolved {} to issue {}", url, issue_key);
        self.jira_get_issue(&issue_key).await
    }

    /// Run a JQL search. Results keep the upstream order.
    pub async fn jira_search_issues(
        &self,
        jql: &str,
        limit: Option<u32>,
    ) -> Result<Vec<JiraIssue>, AtlassianError> {
        let jql = require_non_empty(jql, "jql")?;
        let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT);
        tracing::debug!("Jira search: {}", jql);

        let (base, body) = self
            .fetch(
                Product::Jira,
                SEARCH_PATH,
                &[
                    ("jql", jql.to_string()),
                    ("maxResults", limit.to_string()),
                    ("fields", ISSUE_FIELDS.to_string()),
                ],
            )
            .await?;

        let raw: RawIssueSearch = decode(body, "Jira search result")?;
        Ok(raw.issues.into_iter().map(|i| i.normalize(&base)).collect())
    }

    /// List visible projects. The endpoint is unpaged and returns every
    /// project at once; `limit` truncates that array without reordering it,
    /// and no limit returns all of it.
    pub async fn jira_list_projects(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<JiraProject>, AtlassianError> {
        let limit = limit.map_or(usize::MAX, |n| n.max(1) as usize);
        let (base, body) = self
            .fetch(
                Product::Jira,
                PROJECT_PATH,
                &[("expand", PROJECT_EXPAND.to_string())],
            )
            .await?;

        let raw: Vec<RawProject> = decode(body, "Jira project list")?;
        Ok(raw
            .into_iter()
            .take(limit)
            .map(|p| p.normalize(&base))
            .collect())
    }
}
