//! MCP Server Implementation
//!
//! Routes the `salesforce_*` tools to [`SalesforceClient`] and the analysis
//! prompts to the brief builders in `forcelink-core`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use forcelink_core::config::AppConfig;
use forcelink_core::errors::ForceError;
use forcelink_core::fields::FieldType;
use forcelink_core::prompts::{build_brief, PromptArgs, PromptContext, PromptName};
use forcelink_salesforce::{AggregateInput, HierarchyDirection, SalesforceClient, TrendPeriod, TrendRequest};
use rmcp::{
    handler::server::{
        router::{prompt::PromptRouter, tool::ToolRouter},
        wrapper::Parameters,
    },
    model::*,
    prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router,
    transport::stdio,
    service::RequestContext,
    ErrorData, RoleServer, ServerHandler, ServiceExt,
};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::prompts::*;
use crate::tools::*;
use crate::{McpError, McpResult};

/// Main MCP server for Forcelink
#[derive(Clone)]
pub struct ForcelinkMcpServer {
    client: SalesforceClient,
    prompt_context: Arc<PromptContext>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl std::fmt::Debug for ForcelinkMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForcelinkMcpServer").field("client", &self.client).finish_non_exhaustive()
    }
}

impl ForcelinkMcpServer {
    pub fn new(client: SalesforceClient, prompt_context: PromptContext) -> Self {
        Self {
            client,
            prompt_context: Arc::new(prompt_context),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    pub fn from_config(config: &AppConfig) -> McpResult<Self> {
        let client = SalesforceClient::from_config(config)?;
        Ok(Self::new(client, PromptContext::from_config(config)))
    }

    /// Names of every registered tool.
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router.list_all().into_iter().map(|tool| tool.name.to_string()).collect()
    }

    /// Names of every registered prompt.
    pub fn prompt_names(&self) -> Vec<String> {
        self.prompt_router.list_all().into_iter().map(|prompt| prompt.name.to_string()).collect()
    }

    /// Run the server with stdio transport
    pub async fn run_stdio(self) -> McpResult<()> {
        info!(
            event_name = "mcp.server.starting",
            correlation_id = "bootstrap",
            transport = "stdio",
            tools = TOTAL_TOOLS,
            "starting MCP server"
        );

        let service = self.serve(stdio()).await.map_err(|error| McpError::Transport(error.to_string()))?;
        service.waiting().await.map_err(|error| McpError::Transport(error.to_string()))?;

        info!(event_name = "mcp.server.stopped", correlation_id = "shutdown", "MCP server shutdown complete");
        Ok(())
    }

    /// Runs one tool call under a fresh correlation id. Salesforce failures
    /// become error results carrying the structured error payload.
    async fn run<F>(&self, tool: &'static str, operation: F) -> Result<CallToolResult, ErrorData>
    where
        F: Future<Output = Result<Value, ForceError>>,
    {
        let correlation_id = Uuid::new_v4();
        let started = Instant::now();
        info!(event_name = "mcp.tool.started", correlation_id = %correlation_id, tool, "tool call started");

        match operation.await {
            Ok(value) => {
                info!(
                    event_name = "mcp.tool.completed",
                    correlation_id = %correlation_id,
                    tool,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tool call completed"
                );
                let content = serde_json::to_string_pretty(&value)
                    .map_err(|error| ErrorData::internal_error(error.to_string(), None))?;
                Ok(CallToolResult::success(vec![Content::text(content)]))
            }
            Err(error) => {
                warn!(
                    event_name = "mcp.tool.failed",
                    correlation_id = %correlation_id,
                    tool,
                    error_kind = error.kind(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "tool call failed"
                );
                let content = serde_json::to_string_pretty(&error.to_payload())
                    .map_err(|error| ErrorData::internal_error(error.to_string(), None))?;
                Ok(CallToolResult::error(vec![Content::text(content)]))
            }
        }
    }

    fn render_prompt(&self, name: PromptName, args: impl IntoPromptArgs) -> Result<GetPromptResult, ErrorData> {
        let correlation_id = Uuid::new_v4();
        let brief = args.into_prompt_args().and_then(|args| build_brief(name, &args, &self.prompt_context));

        match brief {
            Ok(brief) => {
                info!(
                    event_name = "mcp.prompt.rendered",
                    correlation_id = %correlation_id,
                    prompt = name.as_str(),
                    queries = brief.queries.len(),
                    "prompt rendered"
                );
                Ok(GetPromptResult {
                    description: Some(name.info().description.to_string()),
                    messages: vec![PromptMessage::new_text(PromptMessageRole::User, brief.render())],
                })
            }
            Err(error) => {
                warn!(
                    event_name = "mcp.prompt.rejected",
                    correlation_id = %correlation_id,
                    prompt = name.as_str(),
                    error_kind = error.kind(),
                    error = %error,
                    "prompt arguments rejected"
                );
                Err(ErrorData::invalid_params(error.to_string(), Some(error.to_payload())))
            }
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl ForcelinkMcpServer {
    #[tool(
        name = "salesforce_query",
        description = "Execute a SOQL query, following pagination until the result is complete"
    )]
    pub async fn salesforce_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_query", async {
            let result = self.client.query(&input.q, input.max_pages).await?;
            serde_json::to_value(result).map_err(|error| ForceError::Decode(error.to_string()))
        })
        .await
    }

    #[tool(name = "salesforce_sobjects", description = "List all available Salesforce objects")]
    pub async fn salesforce_sobjects(&self) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_sobjects", self.client.sobjects()).await
    }

    #[tool(name = "salesforce_recent", description = "Fetch recently accessed Salesforce records")]
    pub async fn salesforce_recent(
        &self,
        Parameters(input): Parameters<RecentInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_recent", self.client.recent(input.limit)).await
    }

    #[tool(name = "salesforce_search", description = "Execute a SOSL search against Salesforce")]
    pub async fn salesforce_search(
        &self,
        Parameters(input): Parameters<SearchInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_search", self.client.search(&input.q)).await
    }

    #[tool(
        name = "salesforce_describe",
        description = "Get full metadata for a Salesforce object including every field"
    )]
    pub async fn salesforce_describe(
        &self,
        Parameters(input): Parameters<DescribeInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_describe", self.client.describe(&input.object_name)).await
    }

    #[tool(name = "salesforce_create", description = "Create a new record in Salesforce")]
    pub async fn salesforce_create(
        &self,
        Parameters(input): Parameters<CreateInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_create", self.client.create(&input.object_name, &input.record_data)).await
    }

    #[tool(name = "salesforce_update", description = "Update an existing record in Salesforce")]
    pub async fn salesforce_update(
        &self,
        Parameters(input): Parameters<UpdateInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(
            "salesforce_update",
            self.client.update(&input.object_name, input.record_id.as_deref(), &input.record_data),
        )
        .await
    }

    #[tool(name = "salesforce_delete", description = "Delete a record from Salesforce")]
    pub async fn salesforce_delete(
        &self,
        Parameters(input): Parameters<DeleteInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_delete", self.client.delete(&input.object_name, input.record_id.as_deref())).await
    }

    #[tool(
        name = "salesforce_relationships",
        description = "Get related records for a Salesforce record (e.g., Contacts for an Account)"
    )]
    pub async fn salesforce_relationships(
        &self,
        Parameters(input): Parameters<RelationshipsInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(
            "salesforce_relationships",
            self.client.relationships(&input.object_name, &input.record_id, input.relationship_name.as_deref()),
        )
        .await
    }

    #[tool(
        name = "salesforce_lookup",
        description = "Search for Salesforce records by name, email, or other fields"
    )]
    pub async fn salesforce_lookup(
        &self,
        Parameters(input): Parameters<LookupInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let fields = input.search_fields.unwrap_or_default();
        self.run(
            "salesforce_lookup",
            self.client.lookup(&input.object_name, &input.search_term, &fields, input.limit),
        )
        .await
    }

    #[tool(
        name = "salesforce_hierarchy",
        description = "Navigate parent (up) or child (down) relationships of a Salesforce record"
    )]
    pub async fn salesforce_hierarchy(
        &self,
        Parameters(input): Parameters<HierarchyInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_hierarchy", async {
            let direction = match input.direction.as_deref() {
                Some(direction) => direction.parse::<HierarchyDirection>()?,
                None => HierarchyDirection::default(),
            };
            self.client.hierarchy(&input.object_name, &input.record_id, direction).await
        })
        .await
    }

    #[tool(
        name = "salesforce_aggregate",
        description = "Statistical analysis of Salesforce data (COUNT, SUM, AVG, MIN, MAX) with optional grouping"
    )]
    pub async fn salesforce_aggregate(
        &self,
        Parameters(input): Parameters<AggregateToolInput>,
    ) -> Result<CallToolResult, ErrorData> {
        let aggregates = input.aggregates.into_iter().map(AggregateInput::from).collect::<Vec<_>>();
        self.run(
            "salesforce_aggregate",
            self.client.aggregate(
                &input.object_name,
                &aggregates,
                input.group_by.as_deref(),
                input.where_clause.as_deref(),
                input.having.as_deref(),
                input.limit,
            ),
        )
        .await
    }

    #[tool(name = "salesforce_reports", description = "Find and describe existing Salesforce reports")]
    pub async fn salesforce_reports(
        &self,
        Parameters(input): Parameters<ReportsInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(
            "salesforce_reports",
            self.client.reports(input.report_id.as_deref(), input.report_name.as_deref()),
        )
        .await
    }

    #[tool(
        name = "salesforce_trend_analysis",
        description = "Analyze trends over time for Salesforce data by day, week or month"
    )]
    pub async fn salesforce_trend_analysis(
        &self,
        Parameters(input): Parameters<TrendAnalysisInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_trend_analysis", async {
            let period = match input.period.as_deref() {
                Some(period) => period.parse::<TrendPeriod>()?,
                None => TrendPeriod::default(),
            };
            let request = TrendRequest {
                object_name: input.object_name,
                date_field: input.date_field,
                period,
                metrics: input.metrics.unwrap_or_default().into_iter().map(AggregateInput::from).collect(),
                timeframe: input.timeframe,
            };
            self.client.trend_analysis(&request).await
        })
        .await
    }

    #[tool(
        name = "salesforce_pipeline",
        description = "Sales pipeline analysis with stage breakdown, win/loss and optional forecasting"
    )]
    pub async fn salesforce_pipeline(
        &self,
        Parameters(input): Parameters<PipelineInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(
            "salesforce_pipeline",
            self.client.pipeline(
                input.timeframe.as_deref(),
                input.owner_id.as_deref(),
                input.include_forecasting.unwrap_or(false),
            ),
        )
        .await
    }

    #[tool(
        name = "salesforce_case_insights",
        description = "Support case analysis including volume, account type breakdown and owner workload"
    )]
    pub async fn salesforce_case_insights(
        &self,
        Parameters(input): Parameters<CaseInsightsInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(
            "salesforce_case_insights",
            self.client.case_insights(
                input.timeframe.as_deref(),
                input.priority.as_deref(),
                input.status.as_deref(),
            ),
        )
        .await
    }

    #[tool(
        name = "salesforce_lead_funnel",
        description = "Lead conversion funnel analysis by source with quality metrics"
    )]
    pub async fn salesforce_lead_funnel(
        &self,
        Parameters(input): Parameters<LeadFunnelInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run(
            "salesforce_lead_funnel",
            self.client.lead_funnel(
                input.source.as_deref(),
                input.timeframe.as_deref(),
                input.conversion_stage.as_deref(),
            ),
        )
        .await
    }

    #[tool(
        name = "salesforce_describe_fields",
        description = "Describe only the fields of an object that match a name filter and/or field types"
    )]
    pub async fn salesforce_describe_fields(
        &self,
        Parameters(input): Parameters<DescribeFieldsInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_describe_fields", async {
            let field_types = FieldType::parse_list(&input.field_types.unwrap_or_default())?;
            self.client
                .describe_fields(&input.object_name, input.field_filter.as_deref(), &field_types)
                .await
        })
        .await
    }

    #[tool(
        name = "salesforce_find_partner",
        description = "Find partner accounts by name, exact matches first"
    )]
    pub async fn salesforce_find_partner(
        &self,
        Parameters(input): Parameters<FindPartnerInput>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("salesforce_find_partner", self.client.find_partner(&input.search_term, input.limit)).await
    }
}

// ============================================================================
// Prompts
// ============================================================================

#[prompt_router]
impl ForcelinkMcpServer {
    #[prompt(
        name = "quarterly_pipeline_analysis",
        description = "Open pipeline for a fiscal quarter by country, partner coverage, top deals and stage"
    )]
    pub async fn quarterly_pipeline_analysis(
        &self,
        Parameters(args): Parameters<QuarterPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::QuarterlyPipelineAnalysis, args)
    }

    #[prompt(
        name = "closed_won_partner_analysis",
        description = "Closed-won revenue with partner source/influence/fulfillment contribution"
    )]
    pub async fn closed_won_partner_analysis(
        &self,
        Parameters(args): Parameters<ClosedWonPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::ClosedWonPartnerAnalysis, args)
    }

    #[prompt(
        name = "partner_engagement_health",
        description = "Active opportunities missing a partner, with late-stage alerts"
    )]
    pub async fn partner_engagement_health(&self) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::PartnerEngagementHealth, PromptArgs::default())
    }

    #[prompt(
        name = "partner_sourced_pipeline",
        description = "Top partner-sourced open opportunities and the source/influence split"
    )]
    pub async fn partner_sourced_pipeline(
        &self,
        Parameters(args): Parameters<LimitPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::PartnerSourcedPipeline, args)
    }

    #[prompt(name = "at_risk_pipeline", description = "Late-stage opportunities with probability below 50%")]
    pub async fn at_risk_pipeline(&self) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::AtRiskPipeline, PromptArgs::default())
    }

    #[prompt(
        name = "new_vs_existing_business",
        description = "Pipeline split between new and existing business with partner attachment"
    )]
    pub async fn new_vs_existing_business(
        &self,
        Parameters(args): Parameters<QuarterPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::NewVsExistingBusiness, args)
    }

    #[prompt(
        name = "lead_conversion_analysis",
        description = "Lead funnel, conversion rates and partner attribution for the fiscal year"
    )]
    pub async fn lead_conversion_analysis(&self) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::LeadConversionAnalysis, PromptArgs::default())
    }

    #[prompt(name = "stalled_opportunities", description = "Open opportunities untouched for a number of days")]
    pub async fn stalled_opportunities(
        &self,
        Parameters(args): Parameters<StalledPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::StalledOpportunities, args)
    }

    #[prompt(
        name = "country_pipeline_dashboard",
        description = "Country-level pipeline dashboard with partner vs direct breakdown"
    )]
    pub async fn country_pipeline_dashboard(
        &self,
        Parameters(args): Parameters<QuarterPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::CountryPipelineDashboard, args)
    }

    #[prompt(
        name = "forecast_vs_actuals",
        description = "Weighted forecast against closed revenue for a fiscal quarter"
    )]
    pub async fn forecast_vs_actuals(
        &self,
        Parameters(args): Parameters<QuarterPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::ForecastVsActuals, args)
    }

    #[prompt(name = "partner_scorecard", description = "Performance scorecard for one partner or all partners")]
    pub async fn partner_scorecard(
        &self,
        Parameters(args): Parameters<PartnerPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::PartnerScorecard, args)
    }

    #[prompt(name = "weekly_briefing", description = "Weekly movement, wins, losses and next-week outlook")]
    pub async fn weekly_briefing(&self) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::WeeklyBriefing, PromptArgs::default())
    }

    #[prompt(
        name = "partner_qbr_prep",
        description = "Quarterly business review preparation for a specific partner"
    )]
    pub async fn partner_qbr_prep(
        &self,
        Parameters(args): Parameters<QbrPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::PartnerQbrPrep, args)
    }

    #[prompt(
        name = "competitive_analysis",
        description = "Win/loss against competitors with the partner factor"
    )]
    pub async fn competitive_analysis(
        &self,
        Parameters(args): Parameters<CompetitorPromptArgs>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.render_prompt(PromptName::CompetitiveAnalysis, args)
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for ForcelinkMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().enable_prompts().build(),
            server_info: Implementation {
                name: "forcelink-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Forcelink MCP Server - Salesforce REST tools (SOQL, SOSL, CRUD, describe, \
                 navigation, analytics) and sales-operations analysis prompts."
                    .to_string(),
            ),
        }
    }
}
