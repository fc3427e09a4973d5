pub mod config;
pub mod doctor;
pub mod prompt;
pub mod query;

use std::env;
use std::path::PathBuf;

use forcelink_core::config::{AppConfig, ConfigError, LoadOptions};
use forcelink_core::errors::ForceError;
use serde::Serialize;

/// Names an explicit config file; when set the file must exist.
pub const CONFIG_PATH_ENV: &str = "FORCELINK_CONFIG";

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Validation problems exit 2, everything that reached Salesforce exits 3.
    pub fn from_force_error(command: &str, error: &ForceError) -> Self {
        let exit_code = match error {
            ForceError::Validation(_) => 2,
            _ => 3,
        };
        Self::failure(command, error.kind(), error.to_string(), exit_code)
    }

    pub fn config_failure(command: &str, error: &ConfigError) -> Self {
        Self::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    }
}

pub(crate) fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

pub(crate) fn load_config() -> Result<AppConfig, ConfigError> {
    let config_path = config_path();
    AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        ..LoadOptions::default()
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
