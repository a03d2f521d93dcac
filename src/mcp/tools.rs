//! Tool catalogue and dispatch into [`AtlassianService`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::atlassian::{AtlassianError, AtlassianService, DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT};

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Atlassian(#[from] AtlassianError),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Deserialize)]
struct PageIdArgs {
    page_id: String,
}

#[derive(Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Deserialize)]
struct PageSearchArgs {
    query: String,
    limit: Option<u32>,
}

#[derive(Deserialize)]
struct IssueKeyArgs {
    issue_key: String,
}

#[derive(Deserialize)]
struct IssueSearchArgs {
    jql: String,
    limit: Option<u32>,
}

#[derive(Deserialize, Default)]
struct LimitArgs {
    limit: Option<u32>,
}

fn string_property(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn limit_property(description: &str, default: u32) -> Value {
    json!({"type": "integer", "description": description, "default": default, "minimum": 1})
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({"type": "object", "properties": properties, "required": required})
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "confluence_get_page",
            description: "Get a specific Confluence page by ID",
            input_schema: schema(
                json!({"page_id": string_property("The ID of the Confluence page")}),
                &["page_id"],
            ),
        },
        ToolDefinition {
            name: "confluence_get_page_by_url",
            description: "Get a Confluence page by its URL",
            input_schema: schema(
                json!({"url": string_property("The full URL of the Confluence page")}),
                &["url"],
            ),
        },
        ToolDefinition {
            name: "confluence_search_pages",
            description: "Search for pages in Confluence using CQL or free text",
            input_schema: schema(
                json!({
                    "query": string_property("CQL query, or free text to match against page content"),
                    "limit": limit_property("Maximum number of results to return", DEFAULT_SEARCH_LIMIT),
                }),
                &["query"],
            ),
        },
        ToolDefinition {
            name: "confluence_list_spaces",
            description: "List all available Confluence spaces",
            input_schema: schema(
                json!({"limit": limit_property("Maximum number of spaces to return", DEFAULT_LIST_LIMIT)}),
                &[],
            ),
        },
        ToolDefinition {
            name: "jira_get_issue",
            description: "Get a specific Jira issue by key",
            input_schema: schema(
                json!({"issue_key": string_property("The key of the Jira issue (e.g., PROJ-123)")}),
                &["issue_key"],
            ),
        },
        ToolDefinition {
            name: "jira_get_issue_by_url",
            description: "Get a Jira issue by its URL",
            input_schema: schema(
                json!({"url": string_property("The full URL of the Jira issue")}),
                &["url"],
            ),
        },
        ToolDefinition {
            name: "jira_search_issues",
            description: "Search for issues using JQL (Jira Query Language)",
            input_schema: schema(
                json!({
                    "jql": string_property("JQL query string"),
                    "limit": limit_property("Maximum number of results to return", DEFAULT_SEARCH_LIMIT),
                }),
                &["jql"],
            ),
        },
        ToolDefinition {
            name: "jira_list_projects",
            description: "List all available Jira projects",
            input_schema: schema(
                json!({"limit": {
                    "type": "integer",
                    "description": "Maximum number of projects to return (all when omitted)",
                    "minimum": 1,
                }}),
                &[],
            ),
        },
    ]
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn to_json<T: Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| {
        ToolError::Atlassian(AtlassianError::MalformedResponse(format!(
            "failed to serialize result: {}",
            e
        )))
    })
}

/// Run the named tool and return its structured result.
pub async fn call_tool(
    service: &AtlassianService,
    name: &str,
    arguments: Value,
) -> Result<Value, ToolError> {
    match name {
        "confluence_get_page" => {
            let args: PageIdArgs = parse_args(name, arguments)?;
            to_json(service.confluence_get_page(&args.page_id).await?)
        }
        "confluence_get_page_by_url" => {
            let args: UrlArgs = parse_args(name, arguments)?;
            to_json(service.confluence_get_page_by_url(&args.url).await?)
        }
        "confluence_search_pages" => {
            let args: PageSearchArgs = parse_args(name, arguments)?;
            to_json(service.confluence_search_pages(&args.query, args.limit).await?)
        }
        "confluence_list_spaces" => {
            let args: LimitArgs = parse_args(name, arguments)?;
            to_json(service.confluence_list_spaces(args.limit).await?)
        }
        "jira_get_issue" => {
            let args: IssueKeyArgs = parse_args(name, arguments)?;
            to_json(service.jira_get_issue(&args.issue_key).await?)
        }
        "jira_get_issue_by_url" => {
            let args: UrlArgs = parse_args(name, arguments)?;
            to_json(service.jira_get_issue_by_url(&args.url).await?)
        }
        "jira_search_issues" => {
            let args: IssueSearchArgs = parse_args(name, arguments)?;
            to_json(service.jira_search_issues(&args.jql, args.limit).await?)
        }
        "jira_list_projects" => {
            let args: LimitArgs = parse_args(name, arguments)?;
            to_json(service.jira_list_projects(args.limit).await?)
        }
        _ => Err(ToolError::UnknownTool(name.to_string())),
    }
}

/// Text shown to the agent for a failed call.
pub fn render_error(error: &AtlassianError) -> String {
    format!("Error [{}]: {}", error.kind(), error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::{AtlassianClient, FailureKind};
    use crate::config::AtlassianConfig;
    use mockito::Matcher;
    use std::sync::Arc;
    use std::time::Duration;

    fn service(base_url: &str) -> AtlassianService {
        let config = Arc::new(AtlassianConfig {
            domain: "acme.atlassian.net".into(),
            email: "dev@acme.com".into(),
            confluence_token: None,
            jira_token: None,
            api_token: Some("legacy".into()),
            timeout: Duration::from_secs(5),
        });
        let client = AtlassianClient::new(config.timeout).with_base_url(base_url);
        AtlassianService::with_client(config, client)
    }

    #[test]
    fn test_tool_catalogue() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "confluence_get_page",
                "confluence_get_page_by_url",
                "confluence_search_pages",
                "confluence_list_spaces",
                "jira_get_issue",
                "jira_get_issue_by_url",
                "jira_search_issues",
                "jira_list_projects",
            ]
        );

        let search = serde_json::to_value(&tools[2]).unwrap();
        assert_eq!(search["inputSchema"]["required"], json!(["query"]));
        assert_eq!(search["inputSchema"]["properties"]["limit"]["default"], 10);

        let spaces = serde_json::to_value(&tools[3]).unwrap();
        assert_eq!(spaces["inputSchema"]["required"], json!([]));

        let projects = serde_json::to_value(&tools[7]).unwrap();
        assert!(projects["inputSchema"]["properties"]["limit"].get("default").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = call_tool(&service("http://127.0.0.1:1"), "jira_delete_issue", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "jira_delete_issue"));
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let err = call_tool(&service("http://127.0.0.1:1"), "jira_get_issue", json!({}))
            .await
            .unwrap_err();
        match err {
            ToolError::InvalidArguments { tool, message } => {
                assert_eq!(tool, "jira_get_issue");
                assert!(message.contains("issue_key"));
            }
            other => panic!("Expected InvalidArguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_url_surfaces_as_atlassian_error() {
        let err = call_tool(
            &service("http://127.0.0.1:1"),
            "confluence_get_page_by_url",
            json!({"url": "https://example.com/foo"}),
        )
        .await
        .unwrap_err();
        match err {
            ToolError::Atlassian(e) => {
                assert_eq!(e.kind(), FailureKind::UnsupportedUrl);
                assert!(render_error(&e).starts_with("Error [unsupported_url]:"));
            }
            other => panic!("Expected Atlassian error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_tools_accept_null_arguments() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/wiki/rest/api/space")
            .match_query(Matcher::UrlEncoded("limit".into(), "50".into()))
            .with_status(200)
            .with_body(r#"{"results": [{"id": 1, "key": "ENG", "name": "Engineering"}]}"#)
            .create_async()
            .await;

        let result = call_tool(&service(&server.url()), "confluence_list_spaces", Value::Null)
            .await
            .unwrap();
        assert_eq!(result[0]["key"], "ENG");
    }

    #[tokio::test]
    async fn test_jira_search_tool_three_issues() {
        let mut server = mockito::Server::new_async().await;
        let issue = |id: &str| {
            json!({"id": id, "key": format!("PROJ-{}", id), "fields": {"summary": format!("issue {}", id)}})
        };
        server
            .mock("GET", "/rest/api/3/search")
            .match_query(Matcher::UrlEncoded("jql".into(), "project=PROJ AND status=Open".into()))
            .with_status(200)
            .with_body(json!({"issues": [issue("7"), issue("3"), issue("5")]}).to_string())
            .create_async()
            .await;

        let result = call_tool(
            &service(&server.url()),
            "jira_search_issues",
            json!({"jql": "project=PROJ AND status=Open"}),
        )
        .await
        .unwrap();

        let keys: Vec<&str> = result
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["PROJ-7", "PROJ-3", "PROJ-5"]);
    }
}
