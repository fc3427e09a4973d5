use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use forcelink_core::config::{resolve_config_path, AppConfig};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{config_path, load_config, CommandResult};

struct ConfigSources {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl ConfigSources {
    fn detect() -> Self {
        let path = resolve_config_path(config_path().as_deref());
        let doc = load_config_file_doc(path.as_deref());
        Self { path, doc }
    }

    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        render_line(key_path, value, self.field_source(key_path, env_keys))
    }

    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 2,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    CommandResult { exit_code: 0, output: render(&config, &ConfigSources::detect()) }
}

fn render(config: &AppConfig, sources: &ConfigSources) -> String {
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "salesforce.base_url",
        &config.salesforce.base_url,
        &["FORCELINK_SALESFORCE_BASE_URL", "SALESFORCE_BASE_URL"],
    ));
    lines.push(sources.line(
        "salesforce.access_token",
        &redact_token(config.salesforce.access_token.expose_secret()),
        &["FORCELINK_SALESFORCE_ACCESS_TOKEN", "SALESFORCE_ACCESS_TOKEN", "SALESFORCE_SID"],
    ));
    lines.push(sources.line(
        "salesforce.api_version",
        &config.salesforce.api_version,
        &["FORCELINK_SALESFORCE_API_VERSION"],
    ));
    lines.push(sources.line(
        "salesforce.timeout_secs",
        &config.salesforce.timeout_secs.to_string(),
        &["FORCELINK_SALESFORCE_TIMEOUT_SECS"],
    ));
    lines.push(sources.line(
        "salesforce.max_query_pages",
        &config.salesforce.max_query_pages.to_string(),
        &["FORCELINK_SALESFORCE_MAX_QUERY_PAGES"],
    ));

    lines.push(sources.line("fiscal.label", &config.fiscal.label, &["FORCELINK_FISCAL_LABEL"]));
    lines.push(sources.line(
        "fiscal.start",
        &config.fiscal.year.start.to_string(),
        &[],
    ));
    lines.push(sources.line("fiscal.end", &config.fiscal.year.end.to_string(), &[]));

    lines.push(sources.line("region.name", &config.region.name, &["FORCELINK_REGION_NAME"]));
    lines.push(sources.line(
        "region.countries",
        &config.region.countries.join(", "),
        &["FORCELINK_REGION_COUNTRIES"],
    ));
    lines.push(sources.line(
        "partner.indicator_field",
        &config.partner.indicator_field,
        &["FORCELINK_PARTNER_INDICATOR_FIELD"],
    ));

    let limits = [
        ("limits.recent", config.limits.recent, "FORCELINK_LIMITS_RECENT"),
        ("limits.lookup", config.limits.lookup, "FORCELINK_LIMITS_LOOKUP"),
        ("limits.aggregate", config.limits.aggregate, "FORCELINK_LIMITS_AGGREGATE"),
        ("limits.relationships", config.limits.relationships, "FORCELINK_LIMITS_RELATIONSHIPS"),
        ("limits.find_partner", config.limits.find_partner, "FORCELINK_LIMITS_FIND_PARTNER"),
    ];
    for (key, value, env_key) in limits {
        lines.push(sources.line(key, &value.to_string(), &[env_key]));
    }

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["FORCELINK_LOGGING_LEVEL", "FORCELINK_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["FORCELINK_LOGGING_FORMAT", "FORCELINK_LOG_FORMAT"],
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Session ids look like `00D5g000004XYZ!AQ...`; only the org part survives.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((org_id, _)) = trimmed.split_once('!') {
        return format!("{org_id}!***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn session_ids_keep_only_the_org_prefix() {
        assert_eq!(redact_token("00D5g000004XYZ!AQ4AQFakeSecret"), "00D5g000004XYZ!***");
        assert_eq!(redact_token("opaque-oauth-token"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn dotted_paths_walk_nested_tables() {
        let doc: toml::Value =
            "[salesforce]\napi_version = \"60.0\"\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "salesforce.api_version"));
        assert!(!contains_path(&doc, "salesforce.base_url"));
        assert!(!contains_path(&doc, "limits.recent"));
    }
}
