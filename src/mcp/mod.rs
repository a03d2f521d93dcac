//! Model Context Protocol surface: JSON-RPC framing, the tool catalogue and
//! the stdio server loop.

mod protocol;
mod server;
mod tools;

pub use protocol::{
    JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
pub use server::{McpServer, TransportError, SERVER_NAME};
pub use tools::{call_tool, render_error, tool_definitions, ToolDefinition, ToolError};
