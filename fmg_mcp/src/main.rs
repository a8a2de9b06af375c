use anyhow::{Context, Result, bail};
use clap::Parser;
use rmcp::ServiceExt;
use std::sync::Arc;

use fmg_mcp::config::Settings;
use fmg_mcp::logging::init_logging;
use fmg_mcp::service::FmgMcpService;

/// FortiManager MCP server: exposes the FortiManager JSON-RPC API as MCP
/// tools over stdio.
///
/// Connection settings come from FORTIMANAGER_* environment variables;
/// flags override individual values.
#[derive(Parser, Debug)]
#[command(name = "fmg_mcp", version, about)]
struct Cli {
    /// FortiManager hostname or IP (overrides FORTIMANAGER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Log to stderr instead of the cache-directory file
    #[arg(long)]
    stderr_logs: bool,

    /// Skip TLS certificate verification (overrides FORTIMANAGER_VERIFY_SSL)
    #[arg(long)]
    insecure: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(log_level) = cli.log_level {
        settings.log_level = log_level;
    }
    if cli.insecure {
        settings.verify_ssl = false;
    }

    init_logging(&settings.log_level, !cli.stderr_logs)?;

    if !settings.is_configured() {
        bail!(
            "FORTIMANAGER_HOST is not set; configure the connection via \
             FORTIMANAGER_* environment variables or --host"
        );
    }

    let client = Arc::new(
        settings
            .build_client()
            .context("failed to build FortiManager client")?,
    );

    // A failed login here is not fatal: the appliance may be briefly
    // unreachable, and the service retries on the first tool call.
    if let Err(err) = client.connect().await {
        tracing::warn!("initial FortiManager connection failed: {err}");
    }

    tracing::info!("starting FortiManager MCP server on stdio");
    let service = FmgMcpService::new(client.clone())
        .serve(rmcp::transport::stdio())
        .await
        .context("failed to start MCP service")?;

    tokio::select! {
        result = service.waiting() => {
            result.context("MCP service terminated abnormally")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
        }
    }

    client.disconnect().await;
    Ok(())
}
