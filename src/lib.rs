// Library entry point for the MCP server binary
pub mod atlassian;
pub mod check;
pub mod config;
pub mod mcp;
