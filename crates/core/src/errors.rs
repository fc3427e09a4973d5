use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

const SESSION_EXPIRED_CODE: &str = "INVALID_SESSION_ID";
const FIELD_NOT_FOUND_CODE: &str = "INVALID_FIELD";
const MAX_RAW_BODY_CHARS: usize = 500;

/// Failure surfaced to tool and prompt callers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ForceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("rate limited by Salesforce: {message}")]
    RateLimit { message: String, retry_after_secs: Option<u64> },
    #[error("Salesforce API error ({status} {code}): {message}")]
    Api { status: u16, code: String, message: String },
    #[error("query stopped at the {max_pages}-page ceiling with more records remaining ({collected} collected and discarded)")]
    PaginationLimit { max_pages: u32, collected: usize },
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("could not decode Salesforce response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl ForceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable kind, one per taxonomy entry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Auth { .. } => "auth_error",
            Self::NotFound { .. } => "not_found_error",
            Self::RateLimit { .. } => "rate_limit_error",
            Self::Api { .. } => "salesforce_api_error",
            Self::PaginationLimit { .. } => "pagination_limit_error",
            Self::Timeout { .. } => "timeout_error",
            Self::Transport(_) => "transport_error",
            Self::Decode(_) => "decode_error",
        }
    }

    /// Upstream HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// Upstream Salesforce `errorCode`, if one was reported.
    pub fn upstream_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// JSON-RPC error code used when the failure crosses the MCP boundary.
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::NotFound { .. } => -32602,
            Self::Auth { .. } => -32001,
            Self::RateLimit { .. } => -32002,
            Self::PaginationLimit { .. } => -32003,
            Self::Timeout { .. } => -32004,
            Self::Api { .. } | Self::Transport(_) | Self::Decode(_) => -32603,
        }
    }

    pub fn is_field_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == FIELD_NOT_FOUND_CODE)
    }

    /// Failures that should stop fan-out operations instead of being
    /// reported per branch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::RateLimit { .. } | Self::Timeout { .. } | Self::Transport(_)
        )
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "kind": self.kind(),
            "status": self.status(),
            "upstreamCode": self.upstream_code(),
            "errorCode": self.error_code(),
            "message": self.to_string(),
        })
    }

    /// Classifies a non-2xx Salesforce response.
    pub fn from_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> Self {
        let (code, message) = summarize_body(body);
        let message = if message.is_empty() { format!("HTTP {status}") } else { message };

        match status {
            401 | 403 => {
                let message = if code.as_deref() == Some(SESSION_EXPIRED_CODE) {
                    "Salesforce access token has expired or is invalid (INVALID_SESSION_ID). \
                     Refresh the bearer token and restart the connector."
                        .to_string()
                } else if status == 401 {
                    format!("{message}. Refresh the Salesforce access token.")
                } else {
                    message
                };
                Self::Auth { status, message }
            }
            404 => Self::NotFound { message },
            429 => Self::RateLimit { message, retry_after_secs },
            _ => {
                let code = code.unwrap_or_else(|| "UNKNOWN".to_string());
                let message = if code == FIELD_NOT_FOUND_CODE {
                    format!(
                        "{message} (hint: run salesforce_describe_fields to list valid field names)"
                    )
                } else {
                    message
                };
                Self::Api { status, code, message }
            }
        }
    }
}

fn summarize_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, String::new());
    }

    if let Ok(errors) = serde_json::from_str::<Vec<UpstreamError>>(trimmed) {
        let code = errors.iter().find_map(|error| error.error_code.clone());
        let message = errors
            .iter()
            .filter_map(|error| error.message.as_deref())
            .collect::<Vec<_>>()
            .join(", ");
        return (code, message);
    }

    if let Ok(error) = serde_json::from_str::<OAuthError>(trimmed) {
        let message = error.error_description.unwrap_or_else(|| error.error.clone());
        return (Some(error.error.to_ascii_uppercase()), message);
    }

    (None, trimmed.chars().take(MAX_RAW_BODY_CHARS).collect())
}
