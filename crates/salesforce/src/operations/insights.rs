use std::str::FromStr;

use forcelink_core::errors::ForceError;
use forcelink_core::soql::{quote_literal, validate_date_literal, validate_record_id};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Value};
use tracing::debug;

use super::first_record;
use crate::client::SalesforceClient;

const DEFAULT_PIPELINE_TIMEFRAME: &str = "THIS_QUARTER";
const DEFAULT_CASE_TIMEFRAME: &str = "THIS_MONTH";
const DEFAULT_LEAD_TIMEFRAME: &str = "THIS_QUARTER";
const DEFAULT_CONVERSION_STAGE: &str = "Opportunity";

impl SalesforceClient {
    /// Open pipeline by stage, closed win/loss, stage counts and optional
    /// forecast totals for one timeframe.
    pub async fn pipeline(
        &self,
        timeframe: Option<&str>,
        owner_id: Option<&str>,
        include_forecasting: bool,
    ) -> Result<Value, ForceError> {
        let timeframe = validate_date_literal(non_blank(timeframe).unwrap_or(DEFAULT_PIPELINE_TIMEFRAME))?;
        let owner_id = non_blank(owner_id).map(validate_record_id).transpose()?;
        let owner_filter =
            owner_id.map(|owner| format!(" AND OwnerId = {}", quote_literal(owner))).unwrap_or_default();

        let stages = self
            .query_records(&format!(
                "SELECT StageName, COUNT(Id) RecordCount, SUM(Amount) TotalValue, AVG(Amount) AvgDealSize, \
                 AVG(Probability) AvgProbability FROM Opportunity \
                 WHERE CloseDate >= {timeframe} AND IsClosed = false{owner_filter} \
                 GROUP BY StageName ORDER BY SUM(Amount) DESC"
            ))
            .await?;
        let win_loss = self
            .query_records(&format!(
                "SELECT IsWon, COUNT(Id) RecordCount, SUM(Amount) TotalValue FROM Opportunity \
                 WHERE CloseDate = {timeframe} AND IsClosed = true{owner_filter} GROUP BY IsWon"
            ))
            .await?;
        let stage_counts = self
            .query_records(&format!(
                "SELECT StageName, COUNT(Id) OppsInStage FROM Opportunity \
                 WHERE CloseDate >= {timeframe}{owner_filter} GROUP BY StageName"
            ))
            .await?;

        let forecasting = if include_forecasting {
            let soql = format!(
                "SELECT SUM(Amount) PipelineValue, SUM(ExpectedRevenue) ForecastAmount FROM Opportunity \
                 WHERE CloseDate = {timeframe} AND IsClosed = false{owner_filter}"
            );
            match self.query_records(&soql).await {
                Ok(records) => first_record(&records),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    debug!(
                        event_name = "salesforce.pipeline.forecast_unavailable",
                        error_kind = error.kind(),
                        "forecast query failed"
                    );
                    json!({ "error": error.to_payload() })
                }
            }
        } else {
            Value::Null
        };

        Ok(json!({
            "timeframe": timeframe,
            "ownerId": owner_id,
            "summary": {
                "totalPipelineValue": sum_field(&stages, "TotalValue"),
                "totalOpportunities": sum_field(&stages, "RecordCount"),
                "stageBreakdown": stages,
            },
            "winLossAnalysis": win_loss,
            "conversionRates": stage_counts,
            "forecasting": forecasting,
        }))
    }

    pub async fn case_insights(
        &self,
        timeframe: Option<&str>,
        priority: Option<&str>,
        status: Option<&str>,
    ) -> Result<Value, ForceError> {
        let timeframe = validate_date_literal(non_blank(timeframe).unwrap_or(DEFAULT_CASE_TIMEFRAME))?;
        let priority = non_blank(priority);
        let status = non_blank(status);

        let mut filters = format!("CreatedDate = {timeframe}");
        if let Some(priority) = priority {
            filters.push_str(&format!(" AND Priority = {}", quote_literal(priority)));
        }
        if let Some(status) = status {
            filters.push_str(&format!(" AND Status = {}", quote_literal(status)));
        }

        let volume = self
            .query_records(&format!(
                "SELECT Status, Priority, COUNT(Id) CaseCount FROM Case WHERE {filters} \
                 GROUP BY Status, Priority ORDER BY Priority, Status"
            ))
            .await?;
        let totals = self.query_records(&format!("SELECT COUNT(Id) TotalCases FROM Case WHERE {filters}")).await?;
        let channels = self
            .query_records(&format!(
                "SELECT Account.Type AccountType, COUNT(Id) CaseCount FROM Case \
                 WHERE {filters} AND Account.Type != null GROUP BY Account.Type ORDER BY COUNT(Id) DESC"
            ))
            .await?;
        let owners = self
            .query_records(&format!(
                "SELECT Owner.Name OwnerName, COUNT(Id) CasesHandled FROM Case WHERE {filters} \
                 GROUP BY Owner.Name ORDER BY COUNT(Id) DESC LIMIT 10"
            ))
            .await?;

        Ok(json!({
            "timeframe": timeframe,
            "filters": { "priority": priority, "status": status },
            "volumeMetrics": volume,
            "escalationMetrics": first_record(&totals),
            "channelBreakdown": channels,
            "ownerPerformance": owners,
        }))
    }

    pub async fn lead_funnel(
        &self,
        source: Option<&str>,
        timeframe: Option<&str>,
        conversion_stage: Option<&str>,
    ) -> Result<Value, ForceError> {
        let timeframe = validate_date_literal(non_blank(timeframe).unwrap_or(DEFAULT_LEAD_TIMEFRAME))?;
        let source = non_blank(source);
        let conversion_stage = non_blank(conversion_stage).unwrap_or(DEFAULT_CONVERSION_STAGE);
        let source_filter =
            source.map(|source| format!(" AND LeadSource = {}", quote_literal(source))).unwrap_or_default();

        let volume = self
            .query_records(&format!(
                "SELECT LeadSource, Status, COUNT(Id) LeadCount FROM Lead \
                 WHERE CreatedDate = {timeframe}{source_filter} \
                 GROUP BY LeadSource, Status ORDER BY LeadSource, Status"
            ))
            .await?;
        let conversion = self
            .query_records(&format!(
                "SELECT LeadSource, IsConverted, COUNT(Id) LeadCount FROM Lead \
                 WHERE CreatedDate = {timeframe}{source_filter} GROUP BY LeadSource, IsConverted"
            ))
            .await?;
        let quality = self
            .query_records(&format!(
                "SELECT LeadSource, Rating, COUNT(Id) LeadCount FROM Lead \
                 WHERE CreatedDate = {timeframe} AND Rating != null{source_filter} \
                 GROUP BY LeadSource, Rating ORDER BY LeadSource, Rating"
            ))
            .await?;
        let opportunities = self
            .query_records(&format!(
                "SELECT Account.Name, ConvertedOpportunity.Amount, ConvertedOpportunity.StageName, \
                 ConvertedOpportunity.CloseDate, LeadSource FROM Lead \
                 WHERE CreatedDate = {timeframe} AND IsConverted = true \
                 AND ConvertedOpportunityId != null{source_filter} \
                 ORDER BY ConvertedOpportunity.Amount DESC NULLS LAST LIMIT 20"
            ))
            .await?;

        Ok(json!({
            "timeframe": timeframe,
            "sourceFilter": source,
            "conversionStage": conversion_stage,
            "leadVolume": volume,
            "funnelMetrics": funnel_metrics(&conversion),
            "qualityAnalysis": quality,
            "topOpportunities": opportunities,
        }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn decimal_of(value: &Value) -> Option<Decimal> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(integer) = number.as_i64() {
        return Some(Decimal::from(integer));
    }
    let text = number.to_string();
    Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
}

/// Sums a numeric column; nulls and non-numbers count as zero.
fn sum_field(records: &[Value], field: &str) -> Decimal {
    records.iter().filter_map(|record| record.get(field).and_then(decimal_of)).sum::<Decimal>().normalize()
}

/// Folds `LeadSource, IsConverted, COUNT(Id)` rows into one entry per source,
/// largest sources first.
fn funnel_metrics(rows: &[Value]) -> Vec<Value> {
    let mut sources: Vec<(Option<String>, u64, u64)> = Vec::new();
    for row in rows {
        let source = row.get("LeadSource").and_then(Value::as_str).map(str::to_string);
        let count = row.get("LeadCount").and_then(Value::as_u64).unwrap_or(0);
        let converted = row.get("IsConverted").and_then(Value::as_bool).unwrap_or(false);

        let index = match sources.iter().position(|(existing, _, _)| *existing == source) {
            Some(index) => index,
            None => {
                sources.push((source, 0, 0));
                sources.len() - 1
            }
        };
        let entry = &mut sources[index];
        entry.1 += count;
        if converted {
            entry.2 += count;
        }
    }
    sources.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));

    sources
        .into_iter()
        .map(|(source, total, converted)| {
            json!({
                "source": source,
                "totalLeads": total,
                "convertedLeads": converted,
                "conversionRate": conversion_rate(converted, total),
            })
        })
        .collect()
}

/// `NN.NN%`, or `0.00%` when there are no leads.
fn conversion_rate(converted: u64, total: u64) -> String {
    if total == 0 {
        return "0.00%".to_string();
    }
    let rate = Decimal::from(converted) * Decimal::ONE_HUNDRED / Decimal::from(total);
    format!("{:.2}%", rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_rate_has_two_decimals() {
        assert_eq!(conversion_rate(1, 3), "33.33%");
        assert_eq!(conversion_rate(2, 3), "66.67%");
        assert_eq!(conversion_rate(5, 5), "100.00%");
        assert_eq!(conversion_rate(0, 0), "0.00%");
    }

    #[test]
    fn funnel_folds_converted_rows_per_source() {
        let rows = vec![
            json!({ "LeadSource": "Web", "IsConverted": false, "LeadCount": 30 }),
            json!({ "LeadSource": "Partner Referral", "IsConverted": true, "LeadCount": 4 }),
            json!({ "LeadSource": "Web", "IsConverted": true, "LeadCount": 10 }),
            json!({ "LeadSource": "Partner Referral", "IsConverted": false, "LeadCount": 4 }),
            json!({ "LeadSource": null, "IsConverted": false, "LeadCount": 2 }),
        ];
        let metrics = funnel_metrics(&rows);
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0]["source"], "Web");
        assert_eq!(metrics[0]["totalLeads"], 40);
        assert_eq!(metrics[0]["convertedLeads"], 10);
        assert_eq!(metrics[0]["conversionRate"], "25.00%");
        assert_eq!(metrics[1]["conversionRate"], "50.00%");
        assert!(metrics[2]["source"].is_null());
    }

    #[test]
    fn pipeline_totals_are_exact_decimals() {
        let stages = vec![
            json!({ "StageName": "Prospecting", "TotalValue": 0.1, "RecordCount": 2 }),
            json!({ "StageName": "Negotiation", "TotalValue": 0.2, "RecordCount": 1 }),
            json!({ "StageName": "Closed", "TotalValue": null, "RecordCount": 3 }),
        ];
        assert_eq!(sum_field(&stages, "TotalValue").to_string(), "0.3");
        assert_eq!(sum_field(&stages, "RecordCount").to_string(), "6");
    }
}
