use forcelink_core::config::AppConfig;
use forcelink_salesforce::SalesforceClient;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::{load_config, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit 2 when configuration or credentials fail, 3 when Salesforce does.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = exit_code(&report);

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn exit_code(report: &DoctorReport) -> u8 {
    let failed = |name: &str| {
        report.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
    };
    if failed("config_validation") || failed("credential_readiness") {
        2
    } else if report.overall_status == CheckStatus::Fail {
        3
    } else {
        0
    }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match load_config() {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let credentials = check_credentials(&config);
            let credentials_ok = credentials.status == CheckStatus::Pass;
            checks.push(credentials);
            if credentials_ok {
                checks.push(check_salesforce_connectivity(&config));
            } else {
                checks.push(skipped("salesforce_connectivity", "credentials are not usable"));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("credential_readiness", "configuration did not load"));
            checks.push(skipped("salesforce_connectivity", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: format!("skipped because {reason}"),
    }
}

fn check_credentials(config: &AppConfig) -> DoctorCheck {
    let token = config.salesforce.access_token.expose_secret();
    if token.chars().any(char::is_whitespace) {
        return DoctorCheck {
            name: "credential_readiness",
            status: CheckStatus::Fail,
            details: "access token contains whitespace; copy it again without line breaks"
                .to_string(),
        };
    }

    DoctorCheck {
        name: "credential_readiness",
        status: CheckStatus::Pass,
        details: format!(
            "bearer token present for API v{} at {}",
            config.salesforce.api_version, config.salesforce.base_url
        ),
    }
}

fn check_salesforce_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "salesforce_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let client = SalesforceClient::from_config(config)?;
        let listing = client.sobjects().await?;
        let objects = listing
            .get("sobjects")
            .and_then(|value| value.as_array())
            .map(Vec::len)
            .unwrap_or_default();
        Ok::<(String, usize), forcelink_core::errors::ForceError>((
            client.api_prefix().to_string(),
            objects,
        ))
    });

    match result {
        Ok((prefix, objects)) => DoctorCheck {
            name: "salesforce_connectivity",
            status: CheckStatus::Pass,
            details: format!("reached `{prefix}`; {objects} sObjects visible"),
        },
        Err(error) => DoctorCheck {
            name: "salesforce_connectivity",
            status: CheckStatus::Fail,
            details: format!("{}: {error}", error.kind()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
