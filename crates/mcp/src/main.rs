//! Forcelink MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Credentials from the environment
//! SALESFORCE_BASE_URL=https://acme.my.salesforce.com \
//! SALESFORCE_ACCESS_TOKEN=00D... forcelink-mcp
//!
//! # Explicit config file (defaults to ./forcelink.toml or ./config/forcelink.toml)
//! FORCELINK_CONFIG=/etc/forcelink.toml forcelink-mcp
//! ```
//!
//! Stdout carries the MCP protocol, so logs are written to stderr.

use std::path::PathBuf;

use anyhow::Result;
use forcelink_core::config::{AppConfig, LoadOptions, LogFormat};
use forcelink_mcp::ForcelinkMcpServer;
use tracing::{info, Level};

fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var_os("FORCELINK_CONFIG").map(PathBuf::from);
    let options = LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    };
    let config = AppConfig::load(options)?;
    init_logging(&config);

    info!(
        event_name = "mcp.server.configured",
        correlation_id = "bootstrap",
        api_version = %config.salesforce.api_version,
        fiscal_year = %config.fiscal.label,
        region = %config.region.name,
        "configuration loaded"
    );

    let server = ForcelinkMcpServer::from_config(&config)?;
    server.run_stdio().await?;

    Ok(())
}
