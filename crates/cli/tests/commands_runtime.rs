use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use forcelink_cli::commands::{config, doctor, prompt, query};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "00Dxx0000001gPL!AQ4AQFakeSecret";

#[test]
fn config_redacts_token_and_attributes_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("forcelink.toml");
    fs::write(&file, "[limits]\nrecent = 7\n").expect("write config");
    let file = file.display().to_string();

    with_env(
        &[
            ("FORCELINK_CONFIG", file.as_str()),
            ("SALESFORCE_BASE_URL", "https://acme.my.salesforce.com"),
            ("SALESFORCE_SID", TOKEN),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);
            let output = result.output;
            assert!(output.contains("- salesforce.access_token = 00Dxx0000001gPL!*** (source: env (SALESFORCE_SID))"));
            assert!(!output.contains("FakeSecret"));
            assert!(output.contains(&format!("- limits.recent = 7 (source: file ({file}))")));
            assert!(output.contains("- salesforce.api_version = 59.0 (source: default)"));
        },
    );
}

#[test]
fn config_reports_validation_failure_without_credentials() {
    with_env(&[], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "missing credentials are a config failure");
        let output = result.output;
        assert!(output.starts_with("config validation failed:"), "{output}");
        assert!(output.contains("salesforce.base_url is required"));
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 2);
        let report: Value = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["name"], "salesforce_connectivity");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

#[test]
fn doctor_passes_against_reachable_org() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path("/services/data/v59.0/sobjects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sobjects": [{"name": "Account"}, {"name": "Opportunity"}]
            })))
            .mount(&server),
    );

    with_env(&[("SALESFORCE_BASE_URL", server.uri().as_str()), ("SALESFORCE_ACCESS_TOKEN", TOKEN)], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);
        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass", "{report}");
        assert!(report["checks"][2]["details"]
            .as_str()
            .is_some_and(|details| details.contains("2 sObjects visible")));

        let human = doctor::run(false);
        assert_eq!(human.exit_code, 0);
        let human = human.output;
        assert!(human.starts_with("doctor: all readiness checks passed"));
        assert!(human.contains("- [ok] salesforce_connectivity:"));
    });
}

#[test]
fn doctor_reports_rejected_session() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!([
                {"errorCode": "INVALID_SESSION_ID", "message": "Session expired or invalid"}
            ])))
            .mount(&server),
    );

    with_env(&[("SALESFORCE_BASE_URL", server.uri().as_str()), ("SALESFORCE_ACCESS_TOKEN", TOKEN)], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 3, "a rejected session is an upstream failure");
        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][2]["status"], "fail");
        assert!(report["checks"][2]["details"]
            .as_str()
            .is_some_and(|details| details.starts_with("auth_error")));
    });
}

#[test]
fn prompt_renders_with_configured_region() {
    with_env(
        &[
            ("SALESFORCE_BASE_URL", "https://acme.my.salesforce.com"),
            ("SALESFORCE_ACCESS_TOKEN", TOKEN),
            ("FORCELINK_REGION_NAME", "Iberia"),
            ("FORCELINK_REGION_COUNTRIES", "Spain,Portugal"),
        ],
        || {
            let request = prompt::PromptRequest {
                quarter: Some("Q2".to_string()),
                ..prompt::PromptRequest::default()
            };
            let result = prompt::run("quarterly_pipeline_analysis", request);
            assert_eq!(result.exit_code, 0, "{}", result.output);
            assert!(result.output.starts_with("# "));
            assert!(result.output.contains("'Spain'"));
        },
    );
}

#[test]
fn prompt_rejects_unknown_name_and_bad_arguments() {
    with_env(
        &[("SALESFORCE_BASE_URL", "https://acme.my.salesforce.com"), ("SALESFORCE_ACCESS_TOKEN", TOKEN)],
        || {
            let result = prompt::run("quarterly_forecast", prompt::PromptRequest::default());
            assert_eq!(result.exit_code, 2);
            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "prompt");
            assert_eq!(payload["error_class"], "validation_error");

            let request = prompt::PromptRequest {
                quarter: Some("Q5".to_string()),
                ..prompt::PromptRequest::default()
            };
            let result = prompt::run("forecast_vs_actuals", request);
            assert_eq!(result.exit_code, 2);

            let result = prompt::run("partner_qbr_prep", prompt::PromptRequest::default());
            assert_eq!(result.exit_code, 2, "partner name is required");
        },
    );
}

#[test]
fn prompt_catalog_lists_fourteen_entries() {
    let result = prompt::list();
    assert_eq!(result.exit_code, 0);
    let catalog = parse_payload(&result.output);
    let entries = catalog.as_array().expect("catalog array");
    assert_eq!(entries.len(), 14);
    assert_eq!(entries[0]["name"], "quarterly_pipeline_analysis");
}

#[test]
fn query_prints_all_pages() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/services/data/v59.0/query"))
            .and(query_param("q", "SELECT Id FROM Account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 2,
                "done": false,
                "nextRecordsUrl": "/services/data/v59.0/query/01gxx-2000",
                "records": [{"Id": "001A"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v59.0/query/01gxx-2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 2,
                "done": true,
                "records": [{"Id": "001B"}]
            })))
            .mount(&server)
            .await;
    });

    with_env(&[("SALESFORCE_BASE_URL", server.uri().as_str()), ("SALESFORCE_ACCESS_TOKEN", TOKEN)], || {
        let result = query::run("SELECT Id FROM Account", None);
        assert_eq!(result.exit_code, 0, "{}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["totalSize"], 2);
        assert_eq!(payload["done"], true);
        assert_eq!(payload["records"][1]["Id"], "001B");
    });
}

#[test]
fn query_maps_failures_to_exit_codes() {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!([
                {"errorCode": "MALFORMED_QUERY", "message": "unexpected token: FORM"}
            ])))
            .mount(&server),
    );

    with_env(&[("SALESFORCE_BASE_URL", server.uri().as_str()), ("SALESFORCE_ACCESS_TOKEN", TOKEN)], || {
        let result = query::run("   ", None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "validation_error");

        let result = query::run("SELECT Id FORM Account", None);
        assert_eq!(result.exit_code, 3);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "query");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "salesforce_api_error");
    });

    with_env(&[], || {
        let result = query::run("SELECT Id FROM Account", None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FORCELINK_CONFIG",
        "FORCELINK_SALESFORCE_BASE_URL",
        "FORCELINK_SALESFORCE_ACCESS_TOKEN",
        "FORCELINK_SALESFORCE_API_VERSION",
        "FORCELINK_SALESFORCE_TIMEOUT_SECS",
        "FORCELINK_SALESFORCE_MAX_QUERY_PAGES",
        "SALESFORCE_BASE_URL",
        "SALESFORCE_ACCESS_TOKEN",
        "SALESFORCE_SID",
        "FORCELINK_FISCAL_LABEL",
        "FORCELINK_REGION_NAME",
        "FORCELINK_REGION_COUNTRIES",
        "FORCELINK_PARTNER_INDICATOR_FIELD",
        "FORCELINK_LIMITS_RECENT",
        "FORCELINK_LOGGING_LEVEL",
        "FORCELINK_LOGGING_FORMAT",
        "FORCELINK_LOG_LEVEL",
        "FORCELINK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
