//! Channel-director report briefs.
//!
//! Each prompt is a pure function of a small argument record and the
//! [`PromptContext`] (fiscal calendar plus sales region). It returns a
//! [`Brief`]: the task, the SOQL the downstream agent should run through the
//! tools, and the analysis sections expected back. Nothing here talks to
//! Salesforce.

mod briefs;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::ForceError;
use crate::fiscal::FiscalCalendar;
use crate::soql::quote_literal;

pub use briefs::*;

pub const LIMIT_RANGE: (u32, u32) = (1, 200);
pub const DAYS_STALLED_RANGE: (u32, u32) = (1, 3650);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptContext {
    pub fiscal: FiscalCalendar,
    pub region_name: String,
    pub countries: Vec<String>,
}

impl Default for PromptContext {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PromptContext {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fiscal: config.fiscal.clone(),
            region_name: config.region.name.clone(),
            countries: config.region.countries.clone(),
        }
    }

    /// `('Portugal','Spain',...)`
    pub fn countries_soql(&self) -> String {
        let quoted = self.countries.iter().map(|country| quote_literal(country)).collect::<Vec<_>>();
        format!("({})", quoted.join(","))
    }

    /// `Portugal, Spain, Italy, Greece, and Cyprus`
    pub fn countries_prose(&self) -> String {
        match self.countries.as_slice() {
            [] => String::new(),
            [only] => only.clone(),
            [head @ .., last] => format!("{}, and {last}", head.join(", ")),
        }
    }

    pub fn fiscal_year_line(&self) -> String {
        format!(
            "Fiscal year {} runs from {} to {}.",
            self.fiscal.label, self.fiscal.year.start, self.fiscal.year.end
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuerySnippet {
    pub label: String,
    pub soql: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: String,
    pub items: Vec<String>,
}

/// Structured natural-language brief; [`Brief::render`] turns it into Markdown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Brief {
    pub title: String,
    pub context: Vec<String>,
    pub task: String,
    pub steps: Vec<String>,
    pub queries: Vec<QuerySnippet>,
    pub sections_heading: String,
    pub sections: Vec<Section>,
    pub closing: Option<String>,
}

impl Brief {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), sections_heading: "Required Analysis".to_string(), ..Self::default() }
    }

    pub fn context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn query(mut self, label: impl Into<String>, lines: &[&str]) -> Self {
        let soql = lines.iter().filter(|line| !line.trim().is_empty()).copied().collect::<Vec<_>>();
        self.queries.push(QuerySnippet { label: label.into(), soql: soql.join("\n") });
        self
    }

    pub fn sections_heading(mut self, heading: impl Into<String>) -> Self {
        self.sections_heading = heading.into();
        self
    }

    pub fn section(mut self, heading: impl Into<String>, items: &[&str]) -> Self {
        self.sections.push(Section {
            heading: heading.into(),
            items: items.iter().map(|item| item.to_string()).collect(),
        });
        self
    }

    pub fn closing(mut self, closing: impl Into<String>) -> Self {
        self.closing = Some(closing.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("# {}\n\n", self.title);
        for line in &self.context {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("\n**Task:** {}\n", self.task));

        if !self.steps.is_empty() {
            out.push_str("\n**Before running the queries:**\n");
            for (index, step) in self.steps.iter().enumerate() {
                out.push_str(&format!("{}. {step}\n", index + 1));
            }
        }

        for query in &self.queries {
            out.push_str(&format!("\n**{}:**\n```sql\n{}\n```\n", query.label, query.soql));
        }

        if !self.sections.is_empty() {
            out.push_str(&format!("\n**{}:**\n", self.sections_heading));
            for (index, section) in self.sections.iter().enumerate() {
                match section.items.as_slice() {
                    [] => out.push_str(&format!("{}. **{}**\n", index + 1, section.heading)),
                    [detail] => {
                        out.push_str(&format!("{}. **{}** - {detail}\n", index + 1, section.heading))
                    }
                    items => {
                        out.push_str(&format!("{}. **{}:**\n", index + 1, section.heading));
                        for item in items {
                            out.push_str(&format!("   - {item}\n"));
                        }
                    }
                }
            }
        }

        if let Some(closing) = &self.closing {
            out.push_str(&format!("\n{closing}\n"));
        }
        out
    }
}

impl fmt::Display for Brief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptName {
    QuarterlyPipelineAnalysis,
    ClosedWonPartnerAnalysis,
    PartnerEngagementHealth,
    PartnerSourcedPipeline,
    AtRiskPipeline,
    NewVsExistingBusiness,
    LeadConversionAnalysis,
    StalledOpportunities,
    CountryPipelineDashboard,
    ForecastVsActuals,
    PartnerScorecard,
    WeeklyBriefing,
    PartnerQbrPrep,
    CompetitiveAnalysis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PromptInfo {
    pub name: PromptName,
    pub description: &'static str,
    pub arguments: &'static [PromptArgument],
}

const QUARTER_ARG: PromptArgument =
    PromptArgument { name: "quarter", description: "Fiscal quarter Q1-Q4", required: false };

pub const PROMPT_CATALOG: [PromptInfo; 14] = [
    PromptInfo {
        name: PromptName::QuarterlyPipelineAnalysis,
        description: "Open pipeline for a fiscal quarter by country, partner coverage, top deals and stage",
        arguments: &[QUARTER_ARG],
    },
    PromptInfo {
        name: PromptName::ClosedWonPartnerAnalysis,
        description: "Closed-won revenue with partner source/influence/fulfillment contribution",
        arguments: &[
            QUARTER_ARG,
            PromptArgument {
                name: "full_year",
                description: "Analyse the whole fiscal year (default true unless a quarter is given)",
                required: false,
            },
        ],
    },
    PromptInfo {
        name: PromptName::PartnerEngagementHealth,
        description: "Active opportunities missing a partner, with late-stage alerts",
        arguments: &[],
    },
    PromptInfo {
        name: PromptName::PartnerSourcedPipeline,
        description: "Top partner-sourced open opportunities and the source/influence split",
        arguments: &[PromptArgument {
            name: "limit",
            description: "Number of deals to list (1-200, default 10)",
            required: false,
        }],
    },
    PromptInfo {
        name: PromptName::AtRiskPipeline,
        description: "Late-stage opportunities with probability below 50%",
        arguments: &[],
    },
    PromptInfo {
        name: PromptName::NewVsExistingBusiness,
        description: "Pipeline split between new and existing business with partner attachment",
        arguments: &[QUARTER_ARG],
    },
    PromptInfo {
        name: PromptName::LeadConversionAnalysis,
        description: "Lead funnel, conversion rates and partner attribution for the fiscal year",
        arguments: &[],
    },
    PromptInfo {
        name: PromptName::StalledOpportunities,
        description: "Open opportunities untouched for a number of days",
        arguments: &[PromptArgument {
            name: "days_stalled",
            description: "Days without modification (1-3650, default 60)",
            required: false,
        }],
    },
    PromptInfo {
        name: PromptName::CountryPipelineDashboard,
        description: "Country-level pipeline dashboard with partner vs direct breakdown",
        arguments: &[QUARTER_ARG],
    },
    PromptInfo {
        name: PromptName::ForecastVsActuals,
        description: "Weighted forecast against closed revenue for a fiscal quarter",
        arguments: &[QUARTER_ARG],
    },
    PromptInfo {
        name: PromptName::PartnerScorecard,
        description: "Performance scorecard for one partner or all partners",
        arguments: &[PromptArgument {
            name: "partner_name",
            description: "Partner account name; omit for all partners",
            required: false,
        }],
    },
    PromptInfo {
        name: PromptName::WeeklyBriefing,
        description: "Weekly movement, wins, losses and next-week outlook",
        arguments: &[],
    },
    PromptInfo {
        name: PromptName::PartnerQbrPrep,
        description: "Quarterly business review preparation for a specific partner",
        arguments: &[
            PromptArgument { name: "partner_name", description: "Partner account name", required: true },
            QUARTER_ARG,
        ],
    },
    PromptInfo {
        name: PromptName::CompetitiveAnalysis,
        description: "Win/loss against competitors with the partner factor",
        arguments: &[PromptArgument {
            name: "competitor",
            description: "Competitor name to match; omit for any competitor",
            required: false,
        }],
    },
];

impl PromptName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuarterlyPipelineAnalysis => "quarterly_pipeline_analysis",
            Self::ClosedWonPartnerAnalysis => "closed_won_partner_analysis",
            Self::PartnerEngagementHealth => "partner_engagement_health",
            Self::PartnerSourcedPipeline => "partner_sourced_pipeline",
            Self::AtRiskPipeline => "at_risk_pipeline",
            Self::NewVsExistingBusiness => "new_vs_existing_business",
            Self::LeadConversionAnalysis => "lead_conversion_analysis",
            Self::StalledOpportunities => "stalled_opportunities",
            Self::CountryPipelineDashboard => "country_pipeline_dashboard",
            Self::ForecastVsActuals => "forecast_vs_actuals",
            Self::PartnerScorecard => "partner_scorecard",
            Self::WeeklyBriefing => "weekly_briefing",
            Self::PartnerQbrPrep => "partner_qbr_prep",
            Self::CompetitiveAnalysis => "competitive_analysis",
        }
    }

    pub fn info(self) -> &'static PromptInfo {
        // Catalog order matches variant order.
        &PROMPT_CATALOG[self as usize]
    }
}

impl fmt::Display for PromptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptName {
    type Err = ForceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        PROMPT_CATALOG
            .iter()
            .map(|info| info.name)
            .find(|name| name.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ForceError::validation(format!("unknown prompt `{needle}`")))
    }
}

/// Union of every prompt's arguments; each prompt reads the ones it declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptArgs {
    pub quarter: Option<String>,
    pub full_year: Option<bool>,
    pub limit: Option<u32>,
    pub days_stalled: Option<u32>,
    pub partner_name: Option<String>,
    pub competitor: Option<String>,
}

/// Renders `name` with `args`.
pub fn build_brief(
    name: PromptName,
    args: &PromptArgs,
    ctx: &PromptContext,
) -> Result<Brief, ForceError> {
    let quarter = args.quarter.as_deref();
    match name {
        PromptName::QuarterlyPipelineAnalysis => quarterly_pipeline_analysis(ctx, quarter),
        PromptName::ClosedWonPartnerAnalysis => {
            closed_won_partner_analysis(ctx, quarter, args.full_year)
        }
        PromptName::PartnerEngagementHealth => Ok(partner_engagement_health(ctx)),
        PromptName::PartnerSourcedPipeline => partner_sourced_pipeline(ctx, args.limit),
        PromptName::AtRiskPipeline => Ok(at_risk_pipeline(ctx)),
        PromptName::NewVsExistingBusiness => new_vs_existing_business(ctx, quarter),
        PromptName::LeadConversionAnalysis => Ok(lead_conversion_analysis(ctx)),
        PromptName::StalledOpportunities => stalled_opportunities(ctx, args.days_stalled),
        PromptName::CountryPipelineDashboard => country_pipeline_dashboard(ctx, quarter),
        PromptName::ForecastVsActuals => forecast_vs_actuals(ctx, quarter),
        PromptName::PartnerScorecard => Ok(partner_scorecard(ctx, args.partner_name.as_deref())),
        PromptName::WeeklyBriefing => Ok(weekly_briefing(ctx)),
        PromptName::PartnerQbrPrep => {
            partner_qbr_prep(ctx, args.partner_name.as_deref().unwrap_or_default(), quarter)
        }
        PromptName::CompetitiveAnalysis => Ok(competitive_analysis(ctx, args.competitor.as_deref())),
    }
}

/// Parses a string-typed integer argument and checks it against `range`.
pub fn parse_int_arg(name: &str, value: &str, range: (u32, u32)) -> Result<u32, ForceError> {
    let parsed = value
        .trim()
        .parse::<u32>()
        .map_err(|_| ForceError::validation(format!("{name} must be a whole number, got `{value}`")))?;
    check_range(name, parsed, range)
}

pub fn parse_bool_arg(name: &str, value: &str) -> Result<bool, ForceError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ForceError::validation(format!("{name} must be true or false, got `{value}`"))),
    }
}

pub(crate) fn check_range(name: &str, value: u32, (min, max): (u32, u32)) -> Result<u32, ForceError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ForceError::validation(format!("{name} must be between {min} and {max}, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_fourteen_prompts_in_variant_order() {
        assert_eq!(PROMPT_CATALOG.len(), 14);
        for info in &PROMPT_CATALOG {
            assert_eq!(info.name.info().name, info.name);
            assert_eq!(info.name.as_str().parse::<PromptName>().ok(), Some(info.name));
        }
        assert!(PromptName::PartnerQbrPrep.info().arguments.iter().any(|arg| arg.required));
    }

    #[test]
    fn every_prompt_renders_with_defaults_except_qbr() {
        let ctx = PromptContext::default();
        for info in &PROMPT_CATALOG {
            let result = build_brief(info.name, &PromptArgs::default(), &ctx);
            if info.name == PromptName::PartnerQbrPrep {
                assert!(result.is_err());
                continue;
            }
            let brief = result.unwrap_or_else(|error| panic!("{}: {error}", info.name));
            let text = brief.render();
            assert!(text.starts_with("# "), "{}", info.name);
            assert!(text.contains("```sql"), "{} has no query", info.name);
            assert!(text.contains("'Portugal'"), "{} lacks the region filter", info.name);
        }
    }

    #[test]
    fn unknown_prompt_name_is_rejected() {
        assert!("quarterly".parse::<PromptName>().is_err());
        assert_eq!("Weekly_Briefing".parse::<PromptName>().ok(), Some(PromptName::WeeklyBriefing));
    }

    #[test]
    fn string_arguments_are_parsed_at_the_boundary() {
        assert_eq!(parse_int_arg("limit", " 25 ", LIMIT_RANGE).ok(), Some(25));
        assert!(parse_int_arg("limit", "0", LIMIT_RANGE).is_err());
        assert!(parse_int_arg("limit", "ten", LIMIT_RANGE).is_err());
        assert_eq!(parse_bool_arg("full_year", "False").ok(), Some(false));
        assert!(parse_bool_arg("full_year", "maybe").is_err());
    }

    #[test]
    fn render_numbers_sections_and_fences_queries() {
        let brief = Brief::new("Demo")
            .context("line one")
            .task("Do the thing.")
            .query("Query", &["SELECT Id", "FROM Account", ""])
            .section("Single", &["inline detail"])
            .section("Multi", &["first", "second"])
            .closing("Done.");

        let text = brief.render();
        assert!(text.contains("**Query:**\n```sql\nSELECT Id\nFROM Account\n```"));
        assert!(text.contains("1. **Single** - inline detail"));
        assert!(text.contains("2. **Multi:**\n   - first\n   - second"));
        assert!(text.ends_with("Done.\n"));
    }

    #[test]
    fn countries_prose_joins_with_oxford_and() {
        let ctx = PromptContext::default();
        assert_eq!(ctx.countries_prose(), "Portugal, Spain, Italy, Greece, and Cyprus");
        assert_eq!(ctx.countries_soql(), "('Portugal','Spain','Italy','Greece','Cyprus')");
    }
}
