use anyhow::{Context, Result};
use atlassian_mcp::atlassian::AtlassianService;
use atlassian_mcp::check::check_connection;
use atlassian_mcp::config::AtlassianConfig;
use atlassian_mcp::mcp::McpServer;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Read-only MCP server for Confluence and Jira.
#[derive(Parser)]
#[command(name = "atlassian-mcp", version, about, long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (the default).
    Serve,

    /// List a few spaces and projects to verify the configured credentials.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "atlassian_mcp=debug"
    } else {
        "atlassian_mcp=info"
    };

    // stdout carries the protocol
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = AtlassianConfig::from_env().context("Failed to load configuration")?;

    tracing::info!(
        "Configured for {} as {} (confluence token: {}, jira token: {}, timeout: {:?})",
        config.domain,
        config.email,
        config.has_confluence_token(),
        config.has_jira_token(),
        config.timeout
    );
    if !config.has_confluence_token() {
        tracing::warn!("No Confluence token configured; Confluence tools will fail");
    }
    if !config.has_jira_token() {
        tracing::warn!("No Jira token configured; Jira tools will fail");
    }

    let service = AtlassianService::new(Arc::new(config));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            McpServer::new(service)
                .serve_stdio()
                .await
                .context("MCP transport failed")?;
        }
        Commands::Check => {
            if !check_connection(&service).await {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
