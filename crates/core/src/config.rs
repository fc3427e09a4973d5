use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fiscal::{DateRange, FiscalCalendar};

pub const DEFAULT_CONFIG_FILE: &str = "forcelink.toml";
pub const NESTED_CONFIG_FILE: &str = "config/forcelink.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub salesforce: SalesforceConfig,
    pub fiscal: FiscalCalendar,
    pub region: RegionConfig,
    pub partner: PartnerConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SalesforceConfig {
    pub base_url: String,
    pub access_token: SecretString,
    pub api_version: String,
    pub timeout_secs: u64,
    pub max_query_pages: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionConfig {
    pub name: String,
    pub countries: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartnerConfig {
    pub indicator_field: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimitsConfig {
    pub recent: u32,
    pub lookup: u32,
    pub aggregate: u32,
    pub relationships: u32,
    pub find_partner: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    pub api_version: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_query_pages: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            salesforce: SalesforceConfig {
                base_url: String::new(),
                access_token: String::new().into(),
                api_version: "59.0".to_string(),
                timeout_secs: 30,
                max_query_pages: 10,
            },
            fiscal: FiscalCalendar::default(),
            region: RegionConfig {
                name: "Southern Europe".to_string(),
                countries: ["Portugal", "Spain", "Italy", "Greece", "Cyprus"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            },
            partner: PartnerConfig { indicator_field: "IsPartner".to_string() },
            limits: LimitsConfig {
                recent: 20,
                lookup: 10,
                aggregate: 100,
                relationships: 100,
                find_partner: 25,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(salesforce) = patch.salesforce {
            if let Some(base_url) = salesforce.base_url {
                self.salesforce.base_url = base_url;
            }
            if let Some(access_token_value) = salesforce.access_token {
                self.salesforce.access_token = secret_value(access_token_value);
            }
            if let Some(api_version) = salesforce.api_version {
                self.salesforce.api_version = api_version;
            }
            if let Some(timeout_secs) = salesforce.timeout_secs {
                self.salesforce.timeout_secs = timeout_secs;
            }
            if let Some(max_query_pages) = salesforce.max_query_pages {
                self.salesforce.max_query_pages = max_query_pages;
            }
        }

        if let Some(fiscal) = patch.fiscal {
            if let Some(label) = fiscal.label {
                self.fiscal.label = label;
            }
            if let Some(start) = fiscal.start {
                self.fiscal.year.start = parse_date("fiscal.start", &start)?;
            }
            if let Some(end) = fiscal.end {
                self.fiscal.year.end = parse_date("fiscal.end", &end)?;
            }
            let quarters = [fiscal.q1, fiscal.q2, fiscal.q3, fiscal.q4];
            for (index, quarter) in quarters.into_iter().enumerate() {
                let Some(quarter) = quarter else {
                    continue;
                };
                let key = format!("fiscal.q{}", index + 1);
                apply_range_patch(&mut self.fiscal.quarters[index], &key, quarter)?;
            }
        }

        if let Some(region) = patch.region {
            if let Some(name) = region.name {
                self.region.name = name;
            }
            if let Some(countries) = region.countries {
                self.region.countries = countries;
            }
        }

        if let Some(partner) = patch.partner {
            if let Some(indicator_field) = partner.indicator_field {
                self.partner.indicator_field = indicator_field;
            }
        }

        if let Some(limits) = patch.limits {
            if let Some(recent) = limits.recent {
                self.limits.recent = recent;
            }
            if let Some(lookup) = limits.lookup {
                self.limits.lookup = lookup;
            }
            if let Some(aggregate) = limits.aggregate {
                self.limits.aggregate = aggregate;
            }
            if let Some(relationships) = limits.relationships {
                self.limits.relationships = relationships;
            }
            if let Some(find_partner) = limits.find_partner {
                self.limits.find_partner = find_partner;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let base_url = read_env("FORCELINK_SALESFORCE_BASE_URL")
            .or_else(|| read_env("SALESFORCE_BASE_URL"));
        if let Some(value) = base_url {
            self.salesforce.base_url = value;
        }
        let access_token = read_env("FORCELINK_SALESFORCE_ACCESS_TOKEN")
            .or_else(|| read_env("SALESFORCE_ACCESS_TOKEN"))
            .or_else(|| read_env("SALESFORCE_SID"));
        if let Some(value) = access_token {
            self.salesforce.access_token = secret_value(value);
        }
        if let Some(value) = read_env("FORCELINK_SALESFORCE_API_VERSION") {
            self.salesforce.api_version = value;
        }
        if let Some(value) = read_env("FORCELINK_SALESFORCE_TIMEOUT_SECS") {
            self.salesforce.timeout_secs = parse_u64("FORCELINK_SALESFORCE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FORCELINK_SALESFORCE_MAX_QUERY_PAGES") {
            self.salesforce.max_query_pages =
                parse_u32("FORCELINK_SALESFORCE_MAX_QUERY_PAGES", &value)?;
        }

        if let Some(value) = read_env("FORCELINK_FISCAL_LABEL") {
            self.fiscal.label = value;
        }

        if let Some(value) = read_env("FORCELINK_REGION_NAME") {
            self.region.name = value;
        }
        if let Some(value) = read_env("FORCELINK_REGION_COUNTRIES") {
            self.region.countries = value
                .split(',')
                .map(str::trim)
                .filter(|country| !country.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = read_env("FORCELINK_PARTNER_INDICATOR_FIELD") {
            self.partner.indicator_field = value;
        }

        if let Some(value) = read_env("FORCELINK_LIMITS_RECENT") {
            self.limits.recent = parse_u32("FORCELINK_LIMITS_RECENT", &value)?;
        }
        if let Some(value) = read_env("FORCELINK_LIMITS_LOOKUP") {
            self.limits.lookup = parse_u32("FORCELINK_LIMITS_LOOKUP", &value)?;
        }
        if let Some(value) = read_env("FORCELINK_LIMITS_AGGREGATE") {
            self.limits.aggregate = parse_u32("FORCELINK_LIMITS_AGGREGATE", &value)?;
        }
        if let Some(value) = read_env("FORCELINK_LIMITS_RELATIONSHIPS") {
            self.limits.relationships = parse_u32("FORCELINK_LIMITS_RELATIONSHIPS", &value)?;
        }
        if let Some(value) = read_env("FORCELINK_LIMITS_FIND_PARTNER") {
            self.limits.find_partner = parse_u32("FORCELINK_LIMITS_FIND_PARTNER", &value)?;
        }

        let log_level =
            read_env("FORCELINK_LOGGING_LEVEL").or_else(|| read_env("FORCELINK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FORCELINK_LOGGING_FORMAT").or_else(|| read_env("FORCELINK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.salesforce.base_url = base_url;
        }
        if let Some(access_token) = overrides.access_token {
            self.salesforce.access_token = secret_value(access_token);
        }
        if let Some(api_version) = overrides.api_version {
            self.salesforce.api_version = api_version;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.salesforce.timeout_secs = timeout_secs;
        }
        if let Some(max_query_pages) = overrides.max_query_pages {
            self.salesforce.max_query_pages = max_query_pages;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_salesforce(&self.salesforce)?;
        self.fiscal.validate().map_err(|error| match error {
            crate::errors::ForceError::Validation(message) => ConfigError::Validation(message),
            other => ConfigError::Validation(other.to_string()),
        })?;
        validate_region(&self.region)?;
        validate_partner(&self.partner)?;
        validate_limits(&self.limits)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Path the loader would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn apply_range_patch(
    range: &mut DateRange,
    key: &str,
    patch: DateRangePatch,
) -> Result<(), ConfigError> {
    if let Some(start) = patch.start {
        range.start = parse_date(&format!("{key}.start"), &start)?;
    }
    if let Some(end) = patch.end {
        range.end = parse_date(&format!("{key}.end"), &end)?;
    }
    Ok(())
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ConfigError::Validation(format!("{key} must be a YYYY-MM-DD date, got `{value}`"))
    })
}

fn validate_salesforce(salesforce: &SalesforceConfig) -> Result<(), ConfigError> {
    let base_url = salesforce.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::Validation(
            "salesforce.base_url is required. Set SALESFORCE_BASE_URL to your instance URL (e.g. https://yourorg.my.salesforce.com)".to_string(),
        ));
    }
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "salesforce.base_url must start with http:// or https://".to_string(),
        ));
    }

    if salesforce.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "salesforce.access_token is required. Set SALESFORCE_ACCESS_TOKEN (or SALESFORCE_SID) to a valid session id or OAuth access token".to_string(),
        ));
    }

    if !is_api_version(&salesforce.api_version) {
        return Err(ConfigError::Validation(format!(
            "salesforce.api_version must look like `59.0`, got `{}`",
            salesforce.api_version
        )));
    }

    if salesforce.timeout_secs == 0 || salesforce.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "salesforce.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if salesforce.max_query_pages == 0 {
        return Err(ConfigError::Validation(
            "salesforce.max_query_pages must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn is_api_version(value: &str) -> bool {
    let Some((major, minor)) = value.split_once('.') else {
        return false;
    };
    let digits = |part: &str| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit());
    major.len() == 2 && minor.len() == 1 && digits(major) && digits(minor)
}

fn validate_region(region: &RegionConfig) -> Result<(), ConfigError> {
    if region.name.trim().is_empty() {
        return Err(ConfigError::Validation("region.name must not be empty".to_string()));
    }
    if region.countries.is_empty() {
        return Err(ConfigError::Validation(
            "region.countries must list at least one country".to_string(),
        ));
    }
    if region.countries.iter().any(|country| country.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "region.countries must not contain blank entries".to_string(),
        ));
    }
    Ok(())
}

fn validate_partner(partner: &PartnerConfig) -> Result<(), ConfigError> {
    crate::soql::validate_field_path(&partner.indicator_field).map(|_| ()).map_err(|_| {
        ConfigError::Validation(format!(
            "partner.indicator_field `{}` is not a valid Account field name",
            partner.indicator_field
        ))
    })
}

fn validate_limits(limits: &LimitsConfig) -> Result<(), ConfigError> {
    let entries = [
        ("limits.recent", limits.recent),
        ("limits.lookup", limits.lookup),
        ("limits.aggregate", limits.aggregate),
        ("limits.relationships", limits.relationships),
        ("limits.find_partner", limits.find_partner),
    ];
    for (key, value) in entries {
        if value == 0 || value > 2000 {
            return Err(ConfigError::Validation(format!("{key} must be in range 1..=2000")));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    salesforce: Option<SalesforcePatch>,
    fiscal: Option<FiscalPatch>,
    region: Option<RegionPatch>,
    partner: Option<PartnerPatch>,
    limits: Option<LimitsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SalesforcePatch {
    base_url: Option<String>,
    access_token: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
    max_query_pages: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FiscalPatch {
    label: Option<String>,
    start: Option<String>,
    end: Option<String>,
    q1: Option<DateRangePatch>,
    q2: Option<DateRangePatch>,
    q3: Option<DateRangePatch>,
    q4: Option<DateRangePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DateRangePatch {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RegionPatch {
    name: Option<String>,
    countries: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PartnerPatch {
    indicator_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitsPatch {
    recent: Option<u32>,
    lookup: Option<u32>,
    aggregate: Option<u32>,
    relationships: Option<u32>,
    find_partner: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use chrono::NaiveDate;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::fiscal::Quarter;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const CREDENTIAL_VARS: &[&str] = &[
        "SALESFORCE_BASE_URL",
        "SALESFORCE_ACCESS_TOKEN",
        "SALESFORCE_SID",
        "FORCELINK_SALESFORCE_BASE_URL",
        "FORCELINK_SALESFORCE_ACCESS_TOKEN",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn set_credentials() {
        clear_vars(CREDENTIAL_VARS);
        env::set_var("SALESFORCE_BASE_URL", "https://example.my.salesforce.com");
        env::set_var("SALESFORCE_ACCESS_TOKEN", "00Dxx!token-from-env");
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(CREDENTIAL_VARS);

        env::set_var("TEST_SF_INSTANCE", "https://acme.my.salesforce.com");
        env::set_var("TEST_SF_TOKEN", "00Dxx!interpolated");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("forcelink.toml");
            fs::write(
                &path,
                r#"
[salesforce]
base_url = "${TEST_SF_INSTANCE}"
access_token = "${TEST_SF_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.salesforce.base_url == "https://acme.my.salesforce.com",
                "base url should be interpolated from environment",
            )?;
            ensure(
                config.salesforce.access_token.expose_secret() == "00Dxx!interpolated",
                "access token should be interpolated from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SF_INSTANCE", "TEST_SF_TOKEN"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        env::remove_var("TEST_SF_ABSENT");

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("forcelink.toml");
        fs::write(&path, "[salesforce]\nbase_url = \"${TEST_SF_ABSENT}\"\n")
            .map_err(|err| err.to_string())?;

        let error = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            .err()
            .ok_or("expected interpolation failure")?;
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_SF_ABSENT"),
            "missing variable should be named",
        )
    }

    #[test]
    fn session_id_is_accepted_as_credential_fallback() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(CREDENTIAL_VARS);
        env::set_var("SALESFORCE_BASE_URL", "https://example.my.salesforce.com");
        env::set_var("SALESFORCE_SID", "00Dxx!session");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.salesforce.access_token.expose_secret() == "00Dxx!session",
                "session id should be used when no access token is set",
            )
        })();

        clear_vars(CREDENTIAL_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_credentials();
        env::set_var("FORCELINK_LOG_LEVEL", "warn");
        env::set_var("FORCELINK_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(CREDENTIAL_VARS);
        clear_vars(&["FORCELINK_LOG_LEVEL", "FORCELINK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_credentials();
        env::set_var("FORCELINK_SALESFORCE_API_VERSION", "60.0");
        env::set_var("FORCELINK_REGION_COUNTRIES", "Spain, Portugal");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("forcelink.toml");
            fs::write(
                &path,
                r#"
[salesforce]
base_url = "https://from-file.my.salesforce.com"
api_version = "58.0"
timeout_secs = 45

[region]
name = "Iberia"
countries = ["Spain"]

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    timeout_secs: Some(10),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.salesforce.timeout_secs == 10, "override timeout should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.salesforce.api_version == "60.0", "env api version should win over file")?;
            ensure(
                config.salesforce.base_url == "https://example.my.salesforce.com",
                "env base url should win over file",
            )?;
            ensure(config.region.name == "Iberia", "file region name should win over default")?;
            ensure(
                config.region.countries == vec!["Spain".to_string(), "Portugal".to_string()],
                "env countries should be split on commas",
            )?;
            ensure(
                crate::prompts::PromptContext::from_config(&config).countries_soql()
                    == "('Spain','Portugal')",
                "countries should render as a quoted IN list",
            )?;
            Ok(())
        })();

        clear_vars(CREDENTIAL_VARS);
        clear_vars(&["FORCELINK_SALESFORCE_API_VERSION", "FORCELINK_REGION_COUNTRIES"]);
        result
    }

    #[test]
    fn fiscal_calendar_can_be_replaced_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_credentials();

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("forcelink.toml");
            fs::write(
                &path,
                r#"
[fiscal]
label = "FY28"
start = "2027-02-01"
end = "2028-01-31"
q1 = { start = "2027-02-01", end = "2027-04-30" }
q2 = { start = "2027-05-01", end = "2027-07-31" }
q3 = { start = "2027-08-01", end = "2027-10-31" }
q4 = { start = "2027-11-01", end = "2028-01-31" }
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.fiscal.label == "FY28", "fiscal label should come from file")?;
            ensure(
                config.fiscal.quarter(Quarter::Q3).start == NaiveDate::from_ymd_opt(2027, 8, 1).unwrap_or_default(),
                "q3 start should come from file",
            )?;
            Ok(())
        })();

        clear_vars(CREDENTIAL_VARS);
        result
    }

    #[test]
    fn fiscal_gap_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_credentials();

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("forcelink.toml");
            fs::write(&path, "[fiscal.q2]\nstart = \"2026-05-05\"\n").map_err(|err| err.to_string())?;

            let error =
                match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
                    Ok(_) => return Err("expected fiscal validation failure".to_string()),
                    Err(error) => error,
                };
            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("fiscal.q2")),
                "validation failure should mention fiscal.q2",
            )
        })();

        clear_vars(CREDENTIAL_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(CREDENTIAL_VARS);
        env::set_var("SALESFORCE_BASE_URL", "https://example.my.salesforce.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("salesforce.access_token")
            );
            ensure(has_message, "validation failure should mention salesforce.access_token")
        })();

        clear_vars(CREDENTIAL_VARS);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_credentials();
        env::set_var("FORCELINK_SALESFORCE_TIMEOUT_SECS", "soon");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions::default())
                .err()
                .ok_or("expected invalid env override")?;
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "FORCELINK_SALESFORCE_TIMEOUT_SECS"),
                "invalid override should name the variable",
            )
        })();

        clear_vars(CREDENTIAL_VARS);
        clear_vars(&["FORCELINK_SALESFORCE_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn bad_api_version_and_scheme_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        set_credentials();

        let result = (|| -> Result<(), String> {
            let bad_version = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    api_version: Some("v59".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            });
            ensure(
                matches!(bad_version, Err(ConfigError::Validation(ref message)) if message.contains("api_version")),
                "api version should be validated",
            )?;

            let bad_scheme = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    base_url: Some("ftp://example.com".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            });
            ensure(
                matches!(bad_scheme, Err(ConfigError::Validation(ref message)) if message.contains("http")),
                "non-http base url should be rejected",
            )
        })();

        clear_vars(CREDENTIAL_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        set_credentials();

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("token-from-env"),
                "debug output should not contain the access token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            ensure(config.limits.recent == 20, "default recent limit should be 20")?;
            ensure(
                config.partner.indicator_field == "IsPartner",
                "default partner indicator should be IsPartner",
            )?;
            Ok(())
        })();

        clear_vars(CREDENTIAL_VARS);
        result
    }
}
