//! Tool operations, one `impl SalesforceClient` block per family.
//!
//! Every operation validates its inputs before the first request, so a
//! `ForceError::Validation` never costs a round trip.

pub mod analytics;
pub mod crud;
pub mod describe;
pub mod insights;
pub mod navigation;
pub mod partner;

use forcelink_core::errors::ForceError;
use serde_json::{json, Map, Value};

/// Results of a fan-out over several child queries. Non-fatal failures
/// land in `skipped` with their error payload.
#[derive(Debug, Default)]
pub(crate) struct FanOut {
    pub(crate) results: Map<String, Value>,
    pub(crate) skipped: Vec<Value>,
}

impl FanOut {
    pub(crate) fn record(&mut self, name: String, outcome: Result<Vec<Value>, ForceError>) -> Result<(), ForceError> {
        match outcome {
            Ok(records) => {
                self.results.insert(name, Value::Array(records));
                Ok(())
            }
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => {
                self.skipped.push(json!({ "relationship": name, "error": error.to_payload() }));
                Ok(())
            }
        }
    }
}

/// Caller limit or the configured default; zero never reaches Salesforce.
pub(crate) fn positive_limit(limit: Option<u32>, default: u32) -> Result<u32, ForceError> {
    match limit.unwrap_or(default) {
        0 => Err(ForceError::validation("limit must be at least 1")),
        limit => Ok(limit),
    }
}

pub(crate) fn first_record(records: &[Value]) -> Value {
    records.first().cloned().unwrap_or_else(|| json!({}))
}

pub(crate) fn require_text<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, ForceError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ForceError::validation(format!("`{name}` is required")))
}

/// Child relationship entry from a describe payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChildRelationship {
    pub(crate) child_object: String,
    pub(crate) field: String,
    pub(crate) relationship_name: Option<String>,
}

impl ChildRelationship {
    /// Relationship name, or the child object when the relationship is unnamed.
    pub(crate) fn key(&self) -> &str {
        self.relationship_name.as_deref().unwrap_or(&self.child_object)
    }
}

pub(crate) fn child_relationships(describe: &Value) -> Vec<ChildRelationship> {
    describe
        .get("childRelationships")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let child_object = entry.get("childSObject")?.as_str()?.to_string();
                    let field = entry.get("field")?.as_str()?.to_string();
                    let relationship_name = entry
                        .get("relationshipName")
                        .and_then(Value::as_str)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string);
                    Some(ChildRelationship { child_object, field, relationship_name })
                })
                .collect()
        })
        .unwrap_or_default()
}
