use std::fmt;
use std::str::FromStr;

use forcelink_core::errors::ForceError;
use forcelink_core::soql::{
    build_soql, build_sosl, contains_pattern, quote_literal, validate_field_path, validate_object_name,
    validate_record_id, SoslScope, SoslSearch,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{child_relationships, first_record, positive_limit, require_text, FanOut};
use crate::client::SalesforceClient;

const RELATIONSHIP_FAN_OUT: usize = 5;
const RELATIONSHIP_FAN_OUT_LIMIT: u32 = 10;
const HIERARCHY_FAN_OUT: usize = 3;
const HIERARCHY_CHILD_LIMIT: u32 = 5;
const HIERARCHY_PARENT_FIELDS: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyDirection {
    Up,
    #[default]
    Down,
}

impl HierarchyDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for HierarchyDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HierarchyDirection {
    type Err = ForceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(ForceError::validation(format!(
                "unknown hierarchy direction `{other}` (expected up or down)"
            ))),
        }
    }
}

impl SalesforceClient {
    /// Related records of one record. With `relationship` the named child
    /// object is queried directly; otherwise the first child relationships
    /// from the describe are sampled.
    pub async fn relationships(
        &self,
        object_name: &str,
        record_id: &str,
        relationship: Option<&str>,
    ) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        let record_id = validate_record_id(record_id)?;
        let id_filter = quote_literal(record_id);

        if let Some(relationship) = relationship.map(str::trim).filter(|value| !value.is_empty()) {
            let relationship = validate_object_name(relationship)?;
            let parent = build_soql(object_name, &["Id", "Name"], Some(&format!("Id = {id_filter}")), None, None)?;
            if self.query_records(&parent).await?.is_empty() {
                return Err(ForceError::NotFound {
                    message: format!("record {record_id} not found in {object_name}"),
                });
            }

            let related = build_soql(
                relationship,
                &["Id", "Name"],
                Some(&format!("{object_name}Id = {id_filter}")),
                None,
                Some(self.settings().limits.relationships),
            )?;
            let result = self.query(&related, None).await?;
            return Ok(json!({
                "relationship": relationship,
                "query": related,
                "totalSize": result.total_size,
                "records": result.records,
            }));
        }

        let describe = self.describe(object_name).await?;
        let mut fan_out = FanOut::default();
        for child in child_relationships(&describe).into_iter().take(RELATIONSHIP_FAN_OUT) {
            let outcome = self
                .child_records(&child.child_object, &child.field, &id_filter, RELATIONSHIP_FAN_OUT_LIMIT)
                .await;
            fan_out.record(child.key().to_string(), outcome)?;
        }

        Ok(json!({ "relationships": fan_out.results, "skipped": fan_out.skipped }))
    }

    /// Finds records by a search term, preferring SOSL and falling back to a
    /// SOQL `LIKE` scan when the search endpoint rejects the request.
    pub async fn lookup(
        &self,
        object_name: &str,
        search_term: &str,
        search_fields: &[String],
        limit: Option<u32>,
    ) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        let term = require_text("search_term", Some(search_term))?;
        let limit = positive_limit(limit, self.settings().limits.lookup)?;
        let fields = if search_fields.is_empty() { vec!["Name".to_string()] } else { search_fields.to_vec() };
        for field in &fields {
            validate_field_path(field)?;
        }

        let mut returning = vec!["Id".to_string()];
        returning.extend(fields.iter().filter(|field| field.as_str() != "Id").cloned());
        let scopes = [SoslScope::new(object_name, returning.clone())];
        let sosl = build_sosl(&SoslSearch { term, prefix_match: true, scopes: &scopes, limit: Some(limit) })?;

        match self.search(&sosl).await {
            Ok(results) => return Ok(json!({ "strategy": "sosl", "query": sosl, "results": results })),
            Err(error @ (ForceError::Api { .. } | ForceError::NotFound { .. })) => {
                debug!(
                    event_name = "salesforce.lookup.fallback",
                    object = %object_name,
                    error_kind = error.kind(),
                    "SOSL lookup rejected, falling back to SOQL"
                );
            }
            Err(error) => return Err(error),
        }

        let pattern = contains_pattern(term);
        let condition =
            fields.iter().map(|field| format!("{field} LIKE {pattern}")).collect::<Vec<_>>().join(" OR ");
        let selected = returning.iter().map(String::as_str).collect::<Vec<_>>();
        let soql = build_soql(object_name, &selected, Some(&condition), None, Some(limit))?;
        let result = self.query(&soql, None).await?;
        Ok(json!({ "strategy": "soql", "query": soql, "results": result }))
    }

    pub async fn hierarchy(
        &self,
        object_name: &str,
        record_id: &str,
        direction: HierarchyDirection,
    ) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        let record_id = validate_record_id(record_id)?;
        let id_filter = quote_literal(record_id);
        let describe = self.describe(object_name).await?;

        match direction {
            HierarchyDirection::Up => {
                let parent_fields = parent_reference_fields(&describe);
                if parent_fields.is_empty() {
                    return Ok(json!({ "message": "No parent relationships found", "parents": [] }));
                }

                let mut selected = vec!["Id"];
                selected.extend(
                    parent_fields.iter().filter_map(|field| field.get("name").and_then(Value::as_str)),
                );
                let soql = build_soql(object_name, &selected, Some(&format!("Id = {id_filter}")), None, None)?;
                let records = self.query_records(&soql).await?;
                Ok(json!({ "record": first_record(&records), "parentFields": parent_fields }))
            }
            HierarchyDirection::Down => {
                let children = child_relationships(&describe)
                    .into_iter()
                    .filter(|child| child.field.contains("Parent") || child.relationship_name.is_some())
                    .take(HIERARCHY_FAN_OUT);

                let mut fan_out = FanOut::default();
                for child in children {
                    let outcome = self
                        .child_records(&child.child_object, &child.field, &id_filter, HIERARCHY_CHILD_LIMIT)
                        .await;
                    fan_out.record(child.key().to_string(), outcome)?;
                }
                Ok(json!({ "children": fan_out.results, "skipped": fan_out.skipped }))
            }
        }
    }

    async fn child_records(
        &self,
        child_object: &str,
        field: &str,
        id_filter: &str,
        limit: u32,
    ) -> Result<Vec<Value>, ForceError> {
        let field = validate_field_path(field)?;
        let soql =
            build_soql(child_object, &["Id", "Name"], Some(&format!("{field} = {id_filter}")), None, Some(limit))?;
        self.query_records(&soql).await
    }
}

/// Reference fields that point at a parent record, as `{name, referenceTo, relationshipName}`.
fn parent_reference_fields(describe: &Value) -> Vec<Value> {
    describe
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter(|field| field.get("type").and_then(Value::as_str) == Some("reference"))
                .filter(|field| {
                    field
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name != "Id" && name.ends_with("Id"))
                })
                .take(HIERARCHY_PARENT_FIELDS)
                .map(|field| {
                    json!({
                        "name": field.get("name").cloned().unwrap_or(Value::Null),
                        "referenceTo": field.get("referenceTo").cloned().unwrap_or(Value::Null),
                        "relationshipName": field.get("relationshipName").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("UP".parse::<HierarchyDirection>().ok(), Some(HierarchyDirection::Up));
        assert_eq!(HierarchyDirection::default(), HierarchyDirection::Down);
        assert!("sideways".parse::<HierarchyDirection>().is_err());
    }

    #[test]
    fn parent_fields_skip_id_and_non_references() {
        let describe = json!({
            "fields": [
                { "name": "Id", "type": "id" },
                { "name": "AccountId", "type": "reference", "referenceTo": ["Account"], "relationshipName": "Account" },
                { "name": "Partner__c", "type": "reference" },
                { "name": "OwnerId", "type": "reference", "referenceTo": ["User"] },
                { "name": "CampaignId", "type": "reference" },
                { "name": "ContactId", "type": "reference" }
            ]
        });
        let names = parent_reference_fields(&describe)
            .into_iter()
            .map(|field| field["name"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["AccountId", "OwnerId", "CampaignId"]);
    }
}
