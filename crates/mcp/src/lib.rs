//! Forcelink MCP (Model Context Protocol) Server
//!
//! Exposes the Salesforce tool operations and the analysis prompt catalog
//! to MCP clients over stdio.
//!
//! ## Architecture
//!
//! - `ForcelinkMcpServer`: tool and prompt routers over one `SalesforceClient`
//! - `tools`: tool input types and the tool catalog by category
//! - `prompts`: string-typed prompt arguments, parsed at the boundary
//!
//! ## Example Usage
//!
//! ```no_run
//! use forcelink_core::config::{AppConfig, LoadOptions};
//! use forcelink_mcp::ForcelinkMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(LoadOptions::default())?;
//!     let server = ForcelinkMcpServer::from_config(&config)?;
//!     server.run_stdio().await?;
//!     Ok(())
//! }
//! ```

mod prompts;
mod server;
mod tools;

pub use prompts::*;
pub use server::ForcelinkMcpServer;
pub use tools::*;

use forcelink_core::{ConfigError, ForceError};
use thiserror::Error;

/// Errors raised while starting or running the MCP server.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Salesforce(#[from] ForceError),

    #[error("transport error: {0}")]
    Transport(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Config(_) => -32602, // Invalid params
            McpError::Salesforce(error) => error.error_code(),
            McpError::Transport(_) => -32603, // Internal error
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
