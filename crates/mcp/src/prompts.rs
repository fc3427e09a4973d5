//! Prompt arguments as MCP clients send them.
//!
//! MCP prompt arguments are strings on the wire, so numeric and boolean
//! values are parsed here before they reach the brief builders.

use forcelink_core::errors::ForceError;
use forcelink_core::prompts::{parse_bool_arg, parse_int_arg, PromptArgs, DAYS_STALLED_RANGE, LIMIT_RANGE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Arguments that convert into the shared [`PromptArgs`] record.
pub trait IntoPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError>;
}

impl IntoPromptArgs for PromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        Ok(self)
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuarterPromptArgs {
    /// Fiscal quarter (Q1, Q2, Q3 or Q4)
    #[serde(default)]
    pub quarter: Option<String>,
}

impl IntoPromptArgs for QuarterPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        Ok(PromptArgs { quarter: self.quarter, ..PromptArgs::default() })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClosedWonPromptArgs {
    /// Fiscal quarter (Q1, Q2, Q3 or Q4)
    #[serde(default)]
    pub quarter: Option<String>,
    /// "true" for the whole fiscal year
    #[serde(default)]
    pub full_year: Option<String>,
}

impl IntoPromptArgs for ClosedWonPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        let full_year = blank_to_none(self.full_year)
            .map(|value| parse_bool_arg("full_year", &value))
            .transpose()?;
        Ok(PromptArgs { quarter: self.quarter, full_year, ..PromptArgs::default() })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LimitPromptArgs {
    /// Number of opportunities to list (1-200, default 10)
    #[serde(default)]
    pub limit: Option<String>,
}

impl IntoPromptArgs for LimitPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        let limit = blank_to_none(self.limit)
            .map(|value| parse_int_arg("limit", &value, LIMIT_RANGE))
            .transpose()?;
        Ok(PromptArgs { limit, ..PromptArgs::default() })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct StalledPromptArgs {
    /// Days without activity before a deal counts as stalled (default 60)
    #[serde(default)]
    pub days_stalled: Option<String>,
}

impl IntoPromptArgs for StalledPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        let days_stalled = blank_to_none(self.days_stalled)
            .map(|value| parse_int_arg("days_stalled", &value, DAYS_STALLED_RANGE))
            .transpose()?;
        Ok(PromptArgs { days_stalled, ..PromptArgs::default() })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct PartnerPromptArgs {
    /// Partner account name
    #[serde(default)]
    pub partner_name: Option<String>,
}

impl IntoPromptArgs for PartnerPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        Ok(PromptArgs { partner_name: blank_to_none(self.partner_name), ..PromptArgs::default() })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct QbrPromptArgs {
    /// Partner account name (required)
    #[serde(default)]
    pub partner_name: Option<String>,
    /// Fiscal quarter under review (default Q1)
    #[serde(default)]
    pub quarter: Option<String>,
}

impl IntoPromptArgs for QbrPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        Ok(PromptArgs { partner_name: self.partner_name, quarter: self.quarter, ..PromptArgs::default() })
    }
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CompetitorPromptArgs {
    /// Competitor name to focus on
    #[serde(default)]
    pub competitor: Option<String>,
}

impl IntoPromptArgs for CompetitorPromptArgs {
    fn into_prompt_args(self) -> Result<PromptArgs, ForceError> {
        Ok(PromptArgs { competitor: blank_to_none(self.competitor), ..PromptArgs::default() })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_arguments_are_parsed_and_range_checked() {
        let args = LimitPromptArgs { limit: Some("25".to_string()) }.into_prompt_args().expect("valid");
        assert_eq!(args.limit, Some(25));

        let error = LimitPromptArgs { limit: Some("500".to_string()) }.into_prompt_args().expect_err("too big");
        assert_eq!(error.kind(), "validation_error");

        let error = StalledPromptArgs { days_stalled: Some("soon".to_string()) }
            .into_prompt_args()
            .expect_err("not a number");
        assert!(error.to_string().contains("days_stalled"));
    }

    #[test]
    fn blank_arguments_fall_back_to_defaults() {
        let args = LimitPromptArgs { limit: Some("  ".to_string()) }.into_prompt_args().expect("valid");
        assert_eq!(args.limit, None);

        let args = ClosedWonPromptArgs { quarter: None, full_year: Some("no".to_string()) }
            .into_prompt_args()
            .expect("valid");
        assert_eq!(args.full_year, Some(false));
    }
}
