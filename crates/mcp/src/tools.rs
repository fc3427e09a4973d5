//! MCP tool inputs and the tool catalog.
//!
//! Tools are grouped into categories:
//! - Core: raw SOQL/SOSL, object listing, describe and record CRUD
//! - Navigation: relationships, lookup and hierarchy traversal
//! - Analytics: aggregates, reports, trends and the sales dashboards
//! - Discovery: field discovery and partner account search

use forcelink_salesforce::AggregateInput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Core
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// The SOQL query to execute
    pub q: String,
    /// Page ceiling for `nextRecordsUrl` pagination (defaults to the configured value)
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct RecentInput {
    /// Maximum number of recent records to return (default 20)
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchInput {
    /// The SOSL search query to execute
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DescribeInput {
    /// The Salesforce object to describe (e.g., Account, Contact)
    pub object_name: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateInput {
    /// The Salesforce object (e.g., Account, Contact)
    pub object_name: String,
    /// Field values for the new record
    #[serde(default)]
    pub record_data: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateInput {
    /// The Salesforce object (e.g., Account, Contact)
    pub object_name: String,
    /// Id of the record to update
    #[serde(default)]
    pub record_id: Option<String>,
    /// Field values to change
    #[serde(default)]
    pub record_data: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteInput {
    /// The Salesforce object (e.g., Account, Contact)
    pub object_name: String,
    /// Id of the record to delete
    #[serde(default)]
    pub record_id: Option<String>,
}

// ============================================================================
// Navigation
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipsInput {
    /// Parent object name
    pub object_name: String,
    /// Parent record id
    pub record_id: String,
    /// Child object to query; omit to sample the object's child relationships
    #[serde(default)]
    pub relationship_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LookupInput {
    /// Object to search
    pub object_name: String,
    /// Name, email or other text to look for
    pub search_term: String,
    /// Fields to search and return (default Name)
    #[serde(default)]
    pub search_fields: Option<Vec<String>>,
    /// Maximum results (default 10)
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HierarchyInput {
    /// Object name
    pub object_name: String,
    /// Record id to start from
    pub record_id: String,
    /// `up` for parent references, `down` for child records (default down)
    #[serde(default)]
    pub direction: Option<String>,
}

// ============================================================================
// Analytics
// ============================================================================

/// One `FUNCTION(field) alias` entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AggregateSpec {
    /// COUNT, SUM, AVG, MIN or MAX
    pub function: String,
    /// Field to aggregate (default Id)
    #[serde(default)]
    pub field: Option<String>,
    /// Result alias (default FUNCTION_field)
    #[serde(default)]
    pub alias: Option<String>,
}

impl From<AggregateSpec> for AggregateInput {
    fn from(spec: AggregateSpec) -> Self {
        AggregateInput { function: spec.function, field: spec.field, alias: spec.alias }
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AggregateToolInput {
    /// Object to aggregate
    pub object_name: String,
    /// Aggregate functions to compute, in output order
    pub aggregates: Vec<AggregateSpec>,
    /// Comma-separated GROUP BY fields
    #[serde(default)]
    pub group_by: Option<String>,
    /// SOQL WHERE condition, without the keyword
    #[serde(default)]
    pub where_clause: Option<String>,
    /// SOQL HAVING condition, requires group_by
    #[serde(default)]
    pub having: Option<String>,
    /// Maximum rows (default 100)
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReportsInput {
    /// Report id
    #[serde(default)]
    pub report_id: Option<String>,
    /// Report name or developer name to search for
    #[serde(default)]
    pub report_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TrendAnalysisInput {
    /// Object to analyse
    pub object_name: String,
    /// Date field to bucket by (default CreatedDate)
    #[serde(default)]
    pub date_field: Option<String>,
    /// day, week or month (default month)
    #[serde(default)]
    pub period: Option<String>,
    /// Metrics per bucket (default COUNT(Id) Total)
    #[serde(default)]
    pub metrics: Option<Vec<AggregateSpec>>,
    /// Number of periods to look back (default 6)
    #[serde(default)]
    pub timeframe: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct PipelineInput {
    /// SOQL date literal (default THIS_QUARTER)
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Restrict to one opportunity owner
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Include pipeline and expected revenue totals
    #[serde(default)]
    pub include_forecasting: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CaseInsightsInput {
    /// SOQL date literal (default THIS_MONTH)
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Case priority filter
    #[serde(default)]
    pub priority: Option<String>,
    /// Case status filter
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LeadFunnelInput {
    /// Lead source filter
    #[serde(default)]
    pub source: Option<String>,
    /// SOQL date literal (default THIS_QUARTER)
    #[serde(default)]
    pub timeframe: Option<String>,
    /// Conversion target reported alongside the funnel (default Opportunity)
    #[serde(default)]
    pub conversion_stage: Option<String>,
}

// ============================================================================
// Discovery
// ============================================================================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DescribeFieldsInput {
    /// Object to describe
    pub object_name: String,
    /// Case-insensitive substring the field name must contain
    #[serde(default)]
    pub field_filter: Option<String>,
    /// Field type tags to keep (e.g. reference, picklist, currency)
    #[serde(default)]
    pub field_types: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindPartnerInput {
    /// Text the partner account name must contain
    pub search_term: String,
    /// Maximum matches (default 25)
    #[serde(default)]
    pub limit: Option<u32>,
}

// ============================================================================
// Catalog
// ============================================================================

/// Core tools category
pub struct CoreTools;

/// Navigation tools category
pub struct NavigationTools;

/// Analytics tools category
pub struct AnalyticsTools;

/// Discovery tools category
pub struct DiscoveryTools;

/// Tool category trait
pub trait ToolCategory {
    /// Category name
    fn category_name() -> &'static str
    where
        Self: Sized;
    /// List of tool names in this category
    fn tool_names() -> &'static [&'static str]
    where
        Self: Sized;
}

impl ToolCategory for CoreTools {
    fn category_name() -> &'static str {
        "core"
    }
    fn tool_names() -> &'static [&'static str] {
        &[
            "salesforce_query",
            "salesforce_sobjects",
            "salesforce_recent",
            "salesforce_search",
            "salesforce_describe",
            "salesforce_create",
            "salesforce_update",
            "salesforce_delete",
        ]
    }
}

impl ToolCategory for NavigationTools {
    fn category_name() -> &'static str {
        "navigation"
    }
    fn tool_names() -> &'static [&'static str] {
        &["salesforce_relationships", "salesforce_lookup", "salesforce_hierarchy"]
    }
}

impl ToolCategory for AnalyticsTools {
    fn category_name() -> &'static str {
        "analytics"
    }
    fn tool_names() -> &'static [&'static str] {
        &[
            "salesforce_aggregate",
            "salesforce_reports",
            "salesforce_trend_analysis",
            "salesforce_pipeline",
            "salesforce_case_insights",
            "salesforce_lead_funnel",
        ]
    }
}

impl ToolCategory for DiscoveryTools {
    fn category_name() -> &'static str {
        "discovery"
    }
    fn tool_names() -> &'static [&'static str] {
        &["salesforce_describe_fields", "salesforce_find_partner"]
    }
}

/// All tool names
pub const ALL_TOOL_NAMES: &[&str] = &[
    "salesforce_query",
    "salesforce_sobjects",
    "salesforce_recent",
    "salesforce_search",
    "salesforce_describe",
    "salesforce_create",
    "salesforce_update",
    "salesforce_delete",
    "salesforce_relationships",
    "salesforce_lookup",
    "salesforce_hierarchy",
    "salesforce_aggregate",
    "salesforce_reports",
    "salesforce_trend_analysis",
    "salesforce_pipeline",
    "salesforce_case_insights",
    "salesforce_lead_funnel",
    "salesforce_describe_fields",
    "salesforce_find_partner",
];

/// Total number of tools
pub const TOTAL_TOOLS: usize = ALL_TOOL_NAMES.len();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_counts() {
        assert_eq!(CoreTools::tool_names().len(), 8);
        assert_eq!(NavigationTools::tool_names().len(), 3);
        assert_eq!(AnalyticsTools::tool_names().len(), 6);
        assert_eq!(DiscoveryTools::tool_names().len(), 2);
        assert_eq!(TOTAL_TOOLS, 19);
    }

    #[test]
    fn test_categories_partition_all_tools() {
        let mut categorized = [
            CoreTools::tool_names(),
            NavigationTools::tool_names(),
            AnalyticsTools::tool_names(),
            DiscoveryTools::tool_names(),
        ]
        .concat();
        categorized.sort_unstable();
        let mut all = ALL_TOOL_NAMES.to_vec();
        all.sort_unstable();
        assert_eq!(categorized, all);
    }

    #[test]
    fn test_aggregate_spec_defaults() {
        let spec: AggregateSpec = serde_json::from_value(serde_json::json!({ "function": "sum", "field": "Amount" }))
            .expect("valid spec");
        let input = AggregateInput::from(spec);
        assert_eq!(input.resolve().expect("valid aggregate").render(), "SUM(Amount) SUM_Amount");
    }
}
