use forcelink_salesforce::SalesforceClient;
use tracing::info;

use crate::commands::{load_config, CommandResult};

pub fn run(soql: &str, max_pages: Option<u32>) -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("query", &error),
    };
    crate::init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "query",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let client = SalesforceClient::from_config(&config)?;
        client.query(soql, max_pages).await
    });

    match result {
        Ok(result) => {
            info!(
                event_name = "cli.query.completed",
                correlation_id = "cli",
                total_size = result.total_size,
                records = result.records.len(),
                "query completed"
            );
            match serde_json::to_string_pretty(&result) {
                Ok(output) => CommandResult { exit_code: 0, output },
                Err(error) => {
                    CommandResult::failure("query", "serialization", error.to_string(), 3)
                }
            }
        }
        Err(error) => CommandResult::from_force_error("query", &error),
    }
}
