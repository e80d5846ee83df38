mod config;
mod error;
mod gate;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use adcheck_common::compliance::ComplianceService;
use config::Config;
use server::AdCheckServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting adcheck MCP server");

    let config = Config::from_env()?;
    info!(
        base_url = %config.gemini.base_url,
        profile = %config.profile.name,
        model = %config.profile.model,
        timeout_secs = config.gemini.timeout.map(|t| t.as_secs()),
        location = config.location.describe(),
        "configuration loaded"
    );

    let service = ComplianceService::new(config.gemini.clone(), config.profile.clone());
    if service.is_configured() {
        info!("gemini client configured");
    } else {
        warn!("GEMINI_API_KEY missing: analyses will fail until the key is registered and the server redeployed");
    }

    let server = AdCheckServer::new(Arc::new(service), Arc::new(config.location));

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
