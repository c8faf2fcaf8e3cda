// Standalone MCP server binary

use anyhow::{Context, Result};
use clap::Parser;
use sandbox_core::Config;
use sandbox_mcp::tools::{builtin_registry, ToolContext};
use sandbox_mcp::{McpServer, StdioTransport};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sandbox-mcp", version, about = "MCP server for sandbox scripts and helper programs")]
struct Args {
    /// Configuration file
    #[arg(long, env = "SANDBOX_MCP_CONFIG", default_value = "sandbox-mcp.toml")]
    config: PathBuf,

    /// Override the scripts directory
    #[arg(long)]
    scripts_dir: Option<PathBuf>,

    /// Override the helper programs directory
    #[arg(long)]
    tools_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sandbox_mcp=info,sandbox_core=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("Sandbox MCP server starting...");

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let cwd = std::env::current_dir()?;
    if let Some(dir) = args.scripts_dir {
        config.paths.scripts_dir = cwd.join(dir);
    }
    if let Some(dir) = args.tools_dir {
        config.paths.tools_dir = cwd.join(dir);
    }

    tracing::info!("Scripts directory: {}", config.scripts_path().display());
    tracing::info!("Tools directory: {}", config.tools_path().display());

    let ctx = ToolContext::from_config(&config);
    let registry = builtin_registry(&ctx);

    tracing::info!("Registered {} tools", registry.len());

    let mut server = McpServer::new(registry);
    server.serve(StdioTransport::stdio()).await?;

    Ok(())
}
