use forcelink_core::errors::ForceError;
use forcelink_core::fields::FieldType;
use forcelink_core::soql::validate_object_name;
use serde_json::{json, Map, Value};

use crate::client::SalesforceClient;

/// Keys kept from each describe field entry by `describe_fields`.
const FIELD_SUMMARY_KEYS: [&str; 8] =
    ["name", "label", "type", "custom", "nillable", "referenceTo", "relationshipName", "length"];

impl SalesforceClient {
    pub async fn describe(&self, object_name: &str) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        self.get(&format!("sobjects/{object_name}/describe"), &[]).await
    }

    /// Describes `object_name` and keeps only the fields whose name contains
    /// `field_filter` (case-insensitive) and whose type is in `field_types`.
    /// Either filter may be omitted.
    pub async fn describe_fields(
        &self,
        object_name: &str,
        field_filter: Option<&str>,
        field_types: &[FieldType],
    ) -> Result<Value, ForceError> {
        let describe = self.describe(object_name).await?;
        let fields = describe.get("fields").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
        let needle = field_filter.map(str::trim).filter(|value| !value.is_empty()).map(str::to_lowercase);

        let matched = fields
            .iter()
            .filter(|field| matches_field(field, needle.as_deref(), field_types))
            .map(summarize_field)
            .collect::<Vec<_>>();

        Ok(json!({
            "object": describe.get("name").cloned().unwrap_or_else(|| Value::String(object_name.to_string())),
            "label": describe.get("label").cloned().unwrap_or(Value::Null),
            "totalFields": fields.len(),
            "matchedFields": matched.len(),
            "filter": needle,
            "fieldTypes": field_types.iter().map(|field_type| field_type.as_str()).collect::<Vec<_>>(),
            "fields": matched,
        }))
    }
}

fn matches_field(field: &Value, needle: Option<&str>, field_types: &[FieldType]) -> bool {
    let name = field.get("name").and_then(Value::as_str).unwrap_or_default();
    if let Some(needle) = needle {
        if !name.to_lowercase().contains(needle) {
            return false;
        }
    }
    if field_types.is_empty() {
        return true;
    }
    field
        .get("type")
        .and_then(Value::as_str)
        .and_then(|tag| tag.parse::<FieldType>().ok())
        .is_some_and(|field_type| field_types.contains(&field_type))
}

fn summarize_field(field: &Value) -> Value {
    let mut summary = Map::new();
    for key in FIELD_SUMMARY_KEYS {
        if let Some(value) = field.get(key).filter(|value| !value.is_null()) {
            summary.insert(key.to_string(), value.clone());
        }
    }
    if let Some(values) = field.get("picklistValues").and_then(Value::as_array).filter(|values| !values.is_empty()) {
        let active = values
            .iter()
            .filter(|entry| entry.get("active").and_then(Value::as_bool).unwrap_or(true))
            .filter_map(|entry| entry.get("value").cloned())
            .collect::<Vec<_>>();
        summary.insert("picklistValues".to_string(), Value::Array(active));
    }
    Value::Object(summary)
}
