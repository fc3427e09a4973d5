use forcelink_core::prompts::{build_brief, PromptArgs, PromptContext, PromptName, PROMPT_CATALOG};

use crate::commands::{load_config, CommandResult};

/// Prompt arguments as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct PromptRequest {
    pub quarter: Option<String>,
    pub full_year: Option<bool>,
    pub limit: Option<u32>,
    pub days_stalled: Option<u32>,
    pub partner_name: Option<String>,
    pub competitor: Option<String>,
}

impl From<PromptRequest> for PromptArgs {
    fn from(request: PromptRequest) -> Self {
        PromptArgs {
            quarter: request.quarter,
            full_year: request.full_year,
            limit: request.limit,
            days_stalled: request.days_stalled,
            partner_name: request.partner_name,
            competitor: request.competitor,
        }
    }
}

pub fn list() -> CommandResult {
    match serde_json::to_string_pretty(&PROMPT_CATALOG) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("prompts", "serialization", error.to_string(), 3),
    }
}

pub fn run(name: &str, request: PromptRequest) -> CommandResult {
    let prompt = match name.parse::<PromptName>() {
        Ok(prompt) => prompt,
        Err(error) => return CommandResult::from_force_error("prompt", &error),
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure("prompt", &error),
    };
    let ctx = PromptContext::from_config(&config);

    match build_brief(prompt, &request.into(), &ctx) {
        Ok(brief) => CommandResult { exit_code: 0, output: brief.render() },
        Err(error) => CommandResult::from_force_error("prompt", &error),
    }
}
