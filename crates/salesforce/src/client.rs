use std::time::Duration;

use forcelink_core::config::{AppConfig, LimitsConfig, SalesforceConfig};
use forcelink_core::errors::ForceError;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const DATA_PATH: &str = "/services/data/";

/// Tool-level defaults carried alongside the connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSettings {
    pub max_query_pages: u32,
    pub limits: LimitsConfig,
    pub partner_indicator_field: String,
}

impl ClientSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_query_pages: config.salesforce.max_query_pages,
            limits: config.limits,
            partner_indicator_field: config.partner.indicator_field.clone(),
        }
    }
}

/// One page, or the concatenation of every page, of a SOQL result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub total_size: u64,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_records_url: Option<String>,
}

fn default_done() -> bool {
    true
}

#[derive(Clone)]
pub struct SalesforceClient {
    http: reqwest::Client,
    origin: String,
    api_prefix: String,
    access_token: SecretString,
    timeout_secs: u64,
    settings: ClientSettings,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("api_prefix", &self.api_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ForceError> {
        Self::new(&config.salesforce, ClientSettings::from_config(config))
    }

    pub fn new(config: &SalesforceConfig, settings: ClientSettings) -> Result<Self, ForceError> {
        let (origin, api_prefix) = split_base_url(&config.base_url, &config.api_version)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ForceError::Transport(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http,
            origin,
            api_prefix,
            access_token: config.access_token.clone(),
            timeout_secs: config.timeout_secs,
            settings,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// `https://org.my.salesforce.com/services/data/v59.0`
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// Relative paths resolve under the API prefix; `/services/...` paths
    /// (such as `nextRecordsUrl`) resolve against the instance origin.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("/services/") {
            format!("{}{path}", self.origin)
        } else {
            format!("{}/{}", self.api_prefix, path.trim_start_matches('/'))
        }
    }

    /// Issues one authenticated request and returns the parsed JSON body.
    /// Empty bodies (204) parse to `null`.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ForceError> {
        let url = self.url_for(path);
        debug!(event_name = "salesforce.request", method = %method, path = %path, "sending request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(self.access_token.expose_secret())
            .header(ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|error| self.transport_error(error))?;
        let status = response.status();
        if !status.is_success() {
            let error = self.error_from_response(response).await;
            warn!(
                event_name = "salesforce.request.failed",
                method = %method,
                path = %path,
                status = status.as_u16(),
                error_kind = error.kind(),
                "salesforce request failed"
            );
            return Err(error);
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await.map_err(|error| self.transport_error(error))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|error| ForceError::Decode(error.to_string()))
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ForceError> {
        self.execute(Method::GET, path, query, None).await
    }

    /// Runs a SOQL query and follows `nextRecordsUrl` until the result is
    /// complete. Hitting `max_pages` with records remaining fails with
    /// `PaginationLimit`; the partial records are discarded.
    pub async fn query(&self, soql: &str, max_pages: Option<u32>) -> Result<QueryResult, ForceError> {
        let soql = soql.trim();
        if soql.is_empty() {
            return Err(ForceError::validation("SOQL query must not be empty"));
        }
        let max_pages = max_pages.unwrap_or(self.settings.max_query_pages);
        if max_pages == 0 {
            return Err(ForceError::validation("max_pages must be at least 1"));
        }

        let mut page = decode_page(self.get("query", &[("q", soql.to_string())]).await?)?;
        let total_size = page.total_size;
        let mut records = std::mem::take(&mut page.records);
        let mut pages = 1;

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                return Err(ForceError::Decode(
                    "query result has done=false but no nextRecordsUrl".to_string(),
                ));
            };
            if pages >= max_pages {
                return Err(ForceError::PaginationLimit { max_pages, collected: records.len() });
            }
            page = decode_page(self.get(&next, &[]).await?)?;
            records.append(&mut page.records);
            pages += 1;
        }

        debug!(event_name = "salesforce.query.complete", pages, records = records.len(), "query complete");
        Ok(QueryResult { total_size, done: true, records, next_records_url: None })
    }

    /// Records of a query, for operations that reshape rows.
    pub async fn query_records(&self, soql: &str) -> Result<Vec<Value>, ForceError> {
        Ok(self.query(soql, None).await?.records)
    }

    fn transport_error(&self, error: reqwest::Error) -> ForceError {
        if error.is_timeout() {
            ForceError::Timeout { timeout_secs: self.timeout_secs }
        } else {
            ForceError::Transport(error.to_string())
        }
    }

    async fn error_from_response(&self, response: Response) -> ForceError {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        match response.text().await {
            Ok(body) => ForceError::from_status(status, &body, retry_after),
            Err(error) if error.is_timeout() => ForceError::Timeout { timeout_secs: self.timeout_secs },
            Err(_) => ForceError::from_status(status, "", retry_after),
        }
    }
}

fn decode_page(value: Value) -> Result<QueryResult, ForceError> {
    serde_json::from_value(value)
        .map_err(|error| ForceError::Decode(format!("unexpected query response: {error}")))
}

/// Returns `(origin, api_prefix)`. A base URL that already points at
/// `/services/data/vNN.N` is used as the prefix verbatim.
fn split_base_url(base_url: &str, api_version: &str) -> Result<(String, String), ForceError> {
    let base = base_url.trim().trim_end_matches('/');
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ForceError::validation(format!(
            "Salesforce base URL must start with http:// or https://, got `{base}`"
        )));
    }

    match base.find(DATA_PATH) {
        Some(index) => Ok((base[..index].to_string(), base.to_string())),
        None => Ok((base.to_string(), format!("{base}{DATA_PATH}v{api_version}"))),
    }
}
