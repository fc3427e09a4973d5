use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, Utc};
use forcelink_core::errors::ForceError;
use forcelink_core::soql::{
    build_aggregate_soql, build_soql, contains_pattern, quote_literal, validate_field_path, validate_object_name,
    validate_record_id, Aggregate, AggregateClauses, AggregateFunction,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{first_record, positive_limit};
use crate::client::SalesforceClient;

const REPORT_MATCH_LIMIT: u32 = 10;
const RECENT_REPORTS_LIMIT: u32 = 20;
const TREND_ROW_LIMIT: u32 = 50;
const DEFAULT_TREND_TIMEFRAME: u32 = 6;
const MAX_TREND_TIMEFRAME: u32 = 365;

/// Loosely-typed aggregate as supplied by a caller; `field` defaults to `Id`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateInput {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl AggregateInput {
    pub fn new(function: impl Into<String>, field: Option<&str>, alias: Option<&str>) -> Self {
        Self { function: function.into(), field: field.map(str::to_string), alias: alias.map(str::to_string) }
    }

    pub fn resolve(&self) -> Result<Aggregate, ForceError> {
        Aggregate::parse(&self.function, self.field.as_deref(), self.alias.as_deref())
    }
}

fn resolve_all(inputs: &[AggregateInput]) -> Result<Vec<Aggregate>, ForceError> {
    inputs.iter().map(AggregateInput::resolve).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Day,
    Week,
    #[default]
    Month,
}

impl TrendPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Days covered by one period; a month counts as 30.
    pub fn days(self) -> u32 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    fn bucket_function(self) -> &'static str {
        match self {
            Self::Day => "DAY_IN_MONTH",
            Self::Week => "WEEK_IN_YEAR",
            Self::Month => "CALENDAR_MONTH",
        }
    }
}

impl fmt::Display for TrendPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendPeriod {
    type Err = ForceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(ForceError::validation(format!(
                "unknown trend period `{other}` (expected day, week or month)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrendRequest {
    pub object_name: String,
    pub date_field: Option<String>,
    pub period: TrendPeriod,
    pub metrics: Vec<AggregateInput>,
    pub timeframe: Option<u32>,
}

/// A trend query ready to run, with the window it covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrendPlan {
    pub soql: String,
    pub date_field: String,
    pub timeframe: u32,
    pub start_date: NaiveDate,
    pub metrics: Vec<Aggregate>,
}

impl TrendRequest {
    pub fn plan(&self, today: NaiveDate) -> Result<TrendPlan, ForceError> {
        let object_name = validate_object_name(&self.object_name)?;
        let date_field = validate_field_path(self.date_field.as_deref().unwrap_or("CreatedDate"))?;
        let timeframe = self.timeframe.unwrap_or(DEFAULT_TREND_TIMEFRAME);
        if !(1..=MAX_TREND_TIMEFRAME).contains(&timeframe) {
            return Err(ForceError::validation(format!(
                "timeframe must be between 1 and {MAX_TREND_TIMEFRAME}, got {timeframe}"
            )));
        }

        let metrics = if self.metrics.is_empty() {
            vec![Aggregate::new(AggregateFunction::Count, "Id", Some("Total"))?]
        } else {
            resolve_all(&self.metrics)?
        };

        let window_days = timeframe * self.period.days();
        let start_date = today
            .checked_sub_days(Days::new(u64::from(window_days)))
            .ok_or_else(|| ForceError::validation("trend window reaches before the supported date range"))?;

        let buckets = [
            format!("CALENDAR_YEAR({date_field})"),
            format!("{}({date_field})", self.period.bucket_function()),
        ];
        let rendered = metrics.iter().map(Aggregate::render).collect::<Vec<_>>().join(", ");
        let order = buckets.iter().map(|bucket| format!("{bucket} DESC")).collect::<Vec<_>>().join(", ");
        let soql = format!(
            "SELECT {grouping}, {rendered} FROM {object_name} WHERE {date_field} = LAST_N_DAYS:{window_days} \
             GROUP BY {grouping} ORDER BY {order} LIMIT {TREND_ROW_LIMIT}",
            grouping = buckets.join(", "),
        );

        Ok(TrendPlan { soql, date_field: date_field.to_string(), timeframe, start_date, metrics })
    }
}

impl SalesforceClient {
    pub async fn aggregate(
        &self,
        object_name: &str,
        aggregates: &[AggregateInput],
        group_by: Option<&str>,
        where_clause: Option<&str>,
        having: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ForceError> {
        let resolved = resolve_all(aggregates)?;
        let limit = positive_limit(limit, self.settings().limits.aggregate)?;
        let clauses = AggregateClauses { where_clause, limit: Some(limit) };
        let soql = build_aggregate_soql(object_name, &resolved, group_by, having, clauses)?;
        let results = self.query(&soql, None).await?;

        Ok(json!({
            "query": soql,
            "aggregates": resolved,
            "groupBy": group_by.map(str::trim).filter(|value| !value.is_empty()),
            "results": results,
        }))
    }

    /// Report lookup: by id, by name, or a list of recently run reports
    /// when neither is given.
    pub async fn reports(&self, report_id: Option<&str>, report_name: Option<&str>) -> Result<Value, ForceError> {
        let report_id = report_id.map(str::trim).filter(|value| !value.is_empty());
        let report_name = report_name.map(str::trim).filter(|value| !value.is_empty());

        let target = match (report_id, report_name) {
            (Some(id), _) => validate_record_id(id)?.to_string(),
            (None, Some(name)) => {
                let pattern = contains_pattern(name);
                let soql = build_soql(
                    "Report",
                    &["Id", "Name", "DeveloperName"],
                    Some(&format!("Name LIKE {pattern} OR DeveloperName LIKE {pattern}")),
                    None,
                    Some(REPORT_MATCH_LIMIT),
                )?;
                let matches = self.query_records(&soql).await?;
                match matches.as_slice() {
                    [] => {
                        return Err(ForceError::NotFound {
                            message: format!("no reports found matching `{name}`"),
                        })
                    }
                    [only] => only
                        .get("Id")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| ForceError::Decode("report record has no Id".to_string()))?,
                    candidates => {
                        let available = candidates
                            .iter()
                            .map(|report| {
                                json!({
                                    "id": report.get("Id"),
                                    "name": report.get("Name"),
                                    "developerName": report.get("DeveloperName"),
                                })
                            })
                            .collect::<Vec<_>>();
                        return Ok(json!({
                            "message": "Multiple reports found. Specify report_id or a more precise name.",
                            "availableReports": available,
                        }));
                    }
                }
            }
            (None, None) => {
                let soql = build_soql(
                    "Report",
                    &["Id", "Name", "DeveloperName", "LastRunDate"],
                    Some("LastRunDate != null"),
                    Some("LastRunDate DESC"),
                    Some(RECENT_REPORTS_LIMIT),
                )?;
                let reports = self.query_records(&soql).await?;
                return Ok(json!({ "message": "Recently run reports", "reports": reports }));
            }
        };

        match self.get(&format!("analytics/reports/{target}/describe"), &[]).await {
            Ok(metadata) => return Ok(json!({ "reportId": target, "metadata": metadata })),
            Err(error @ (ForceError::NotFound { .. } | ForceError::Api { .. })) => {
                debug!(
                    event_name = "salesforce.reports.fallback",
                    report_id = %target,
                    error_kind = error.kind(),
                    "analytics API unavailable, reading the report record"
                );
            }
            Err(error) => return Err(error),
        }

        let soql = build_soql(
            "Report",
            &["Id", "Name", "DeveloperName", "Description", "LastRunDate"],
            Some(&format!("Id = {}", quote_literal(&target))),
            None,
            None,
        )?;
        let records = self.query_records(&soql).await?;
        if records.is_empty() {
            return Err(ForceError::NotFound { message: format!("report {target} not found") });
        }
        Ok(json!({
            "message": "Report found but the analytics API is not available for it",
            "reportId": target,
            "report": first_record(&records),
        }))
    }

    pub async fn trend_analysis(&self, request: &TrendRequest) -> Result<Value, ForceError> {
        let plan = request.plan(Utc::now().date_naive())?;
        let trends = self.query(&plan.soql, None).await?;

        Ok(json!({
            "query": plan.soql,
            "period": request.period,
            "timeframe": plan.timeframe,
            "dateField": plan.date_field,
            "startDate": plan.start_date.to_string(),
            "metrics": plan.metrics,
            "trends": trends.records,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 31).expect("valid date")
    }

    #[test]
    fn monthly_trend_defaults_to_count_total() {
        let request = TrendRequest { object_name: "Opportunity".to_string(), ..TrendRequest::default() };
        let plan = request.plan(today()).expect("valid plan");
        assert_eq!(
            plan.soql,
            "SELECT CALENDAR_YEAR(CreatedDate), CALENDAR_MONTH(CreatedDate), COUNT(Id) Total \
             FROM Opportunity WHERE CreatedDate = LAST_N_DAYS:180 \
             GROUP BY CALENDAR_YEAR(CreatedDate), CALENDAR_MONTH(CreatedDate) \
             ORDER BY CALENDAR_YEAR(CreatedDate) DESC, CALENDAR_MONTH(CreatedDate) DESC LIMIT 50"
        );
        assert_eq!(plan.start_date, NaiveDate::from_ymd_opt(2025, 10, 2).expect("valid date"));
    }

    #[test]
    fn weekly_trend_uses_week_buckets_and_custom_metrics() {
        let request = TrendRequest {
            object_name: "Case".to_string(),
            date_field: Some("ClosedDate".to_string()),
            period: TrendPeriod::Week,
            metrics: vec![AggregateInput::new("count", None, Some("Closed"))],
            timeframe: Some(4),
        };
        let plan = request.plan(today()).expect("valid plan");
        assert!(plan.soql.contains("WEEK_IN_YEAR(ClosedDate)"));
        assert!(plan.soql.contains("COUNT(Id) Closed"));
        assert!(plan.soql.contains("ClosedDate = LAST_N_DAYS:28"));
        assert_eq!(plan.start_date, NaiveDate::from_ymd_opt(2026, 3, 3).expect("valid date"));
    }

    #[test]
    fn trend_rejects_zero_timeframe_and_bad_field() {
        let zero = TrendRequest {
            object_name: "Lead".to_string(),
            timeframe: Some(0),
            ..TrendRequest::default()
        };
        assert!(zero.plan(today()).is_err());

        let injected = TrendRequest {
            object_name: "Lead".to_string(),
            date_field: Some("CreatedDate) FROM User --".to_string()),
            ..TrendRequest::default()
        };
        assert_eq!(injected.plan(today()).expect_err("bad field").kind(), "validation_error");
    }

    #[test]
    fn aggregate_input_defaults_field_to_id() {
        let aggregate = AggregateInput::new("sum", Some("Amount"), None).resolve().expect("valid");
        assert_eq!(aggregate.render(), "SUM(Amount) SUM_Amount");
        let count = AggregateInput::new("COUNT", None, None).resolve().expect("valid");
        assert_eq!(count.render(), "COUNT(Id) COUNT_Id");
        assert!(AggregateInput::new("median", None, None).resolve().is_err());
    }

    #[test]
    fn period_parses_known_names_only() {
        assert_eq!("Week".parse::<TrendPeriod>().ok(), Some(TrendPeriod::Week));
        assert!("quarter".parse::<TrendPeriod>().is_err());
    }
}
