//! MCP server over newline-delimited stdio.
//!
//! Requests are read one line at a time and handled on their own task;
//! responses funnel through a channel to a single writer so concurrent calls
//! never interleave their output.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::protocol::*;
use super::tools::{call_tool, render_error, tool_definitions, ToolError};
use crate::atlassian::{AtlassianError, AtlassianService};

pub const SERVER_NAME: &str = "atlassian-mcp";

const RESPONSE_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Writer task failed: {0}")]
    Writer(String),
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct ReadResourceParams {
    uri: String,
}

/// A resource URI the server can read.
#[derive(Debug, PartialEq, Eq)]
enum ResourceUri {
    ConfluencePage(String),
    JiraIssue(String),
}

impl ResourceUri {
    /// Accepts `confluence://page/{id}` and `jira://issue/{key}`.
    fn parse(uri: &str) -> Option<Self> {
        if let Some(page_id) = identifier(uri, "confluence://", "page") {
            return Some(ResourceUri::ConfluencePage(page_id));
        }
        identifier(uri, "jira://", "issue").map(ResourceUri::JiraIssue)
    }
}

fn identifier(uri: &str, scheme: &str, kind: &str) -> Option<String> {
    let rest = uri.strip_prefix(scheme)?.trim_start_matches('/');
    let id = rest.strip_prefix(kind)?.strip_prefix('/')?;
    (!id.is_empty() && !id.contains('/')).then(|| id.to_string())
}

pub struct McpServer {
    service: AtlassianService,
}

impl McpServer {
    pub fn new(service: AtlassianService) -> Self {
        Self { service }
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<(), TransportError> {
        let reader = tokio::io::BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        Arc::new(self).serve(reader, writer).await
    }

    /// Serve newline-delimited JSON-RPC from `reader`, writing responses to `writer`.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_BUFFER);

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_vec(&response)?;
                line.push(b'\n');
                writer.write_all(&line).await?;
                writer.flush().await?;
            }
            Ok::<(), TransportError>(())
        });

        tracing::info!("{} listening on stdio", SERVER_NAME);

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    if tx.send(response).await.is_err() {
                        tracing::error!("Response dropped: writer has stopped");
                    }
                }
            });
        }

        tracing::info!("stdin closed, shutting down");
        drop(tx);

        writer_task
            .await
            .map_err(|e| TransportError::Writer(e.to_string()))?
    }

    /// Handle one raw line. Returns `None` for notifications.
    ///
    /// Text that is not JSON is a parse error; JSON that is not a request
    /// object is an invalid request, answered with its `id` when one is readable.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Unparseable message: {}", e);
                return Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
                ));
            }
        };

        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<JsonRpcId>(id.clone()).ok())
            .unwrap_or(JsonRpcId::Null);

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                tracing::warn!("Invalid JSON-RPC request: {}", e);
                Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ))
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::debug!("Notification: {}", request.method);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Unsupported jsonrpc version: {}", request.jsonrpc)),
            ));
        }

        tracing::debug!("Request {:?}: {}", id, request.method);
        let params = request.params.unwrap_or(Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.tools_call(params).await,
            "resources/list" => Ok(self.resources_list()),
            "resources/read" => self.resources_read(params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"listChanged": false},
                "resources": {"subscribe": false, "listChanged": false},
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }

    async fn tools_call(&self, params: Value) -> Result<Value, JsonRpcError> {
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

        match call_tool(&self.service, &params.name, params.arguments).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result)
                    .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
                Ok(json!({
                    "content": [{"type": "text", "text": text}],
                    "isError": false,
                }))
            }
            Err(ToolError::Atlassian(error)) => {
                tracing::error!("Error calling tool {}: {}", params.name, error);
                Ok(json!({
                    "content": [{"type": "text", "text": render_error(&error)}],
                    "isError": true,
                }))
            }
            Err(error) => Err(JsonRpcError::invalid_params(error.to_string())),
        }
    }

    fn resources_list(&self) -> Value {
        json!({
            "resources": [
                {
                    "uri": "confluence://pages",
                    "name": "Confluence Pages",
                    "description": "Access to Confluence pages, read as confluence://page/{id}",
                    "mimeType": "application/json",
                },
                {
                    "uri": "jira://issues",
                    "name": "Jira Issues",
                    "description": "Access to Jira issues, read as jira://issue/{key}",
                    "mimeType": "application/json",
                },
            ]
        })
    }

    async fn resources_read(&self, params: Value) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid resources/read params: {}", e)))?;

        let resource = ResourceUri::parse(&params.uri)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown resource URI: {}", params.uri)))?;

        let result = match resource {
            ResourceUri::ConfluencePage(page_id) => self
                .service
                .confluence_get_page(&page_id)
                .await
                .and_then(|page| to_value(&page)),
            ResourceUri::JiraIssue(issue_key) => self
                .service
                .jira_get_issue(&issue_key)
                .await
                .and_then(|issue| to_value(&issue)),
        };

        let value = result.map_err(|error| {
            tracing::error!("Error reading resource {}: {}", params.uri, error);
            JsonRpcError::internal_error(error.to_string()).with_data(json!({
                "kind": error.kind(),
                "status": error.http_status(),
            }))
        })?;

        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;

        Ok(json!({
            "contents": [{
                "uri": params.uri,
                "mimeType": "application/json",
                "text": text,
            }]
        }))
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AtlassianError> {
    serde_json::to_value(value).map_err(|e| AtlassianError::MalformedResponse(e.to_string()))
}
