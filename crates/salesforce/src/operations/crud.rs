use forcelink_core::errors::ForceError;
use forcelink_core::soql::{validate_field_path, validate_object_name, validate_record_id};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{positive_limit, require_text};
use crate::client::SalesforceClient;

impl SalesforceClient {
    pub async fn sobjects(&self) -> Result<Value, ForceError> {
        self.get("sobjects", &[]).await
    }

    pub async fn recent(&self, limit: Option<u32>) -> Result<Value, ForceError> {
        let limit = positive_limit(limit, self.settings().limits.recent)?;
        self.get("recent", &[("limit", limit.to_string())]).await
    }

    /// Raw SOSL, sent as written.
    pub async fn search(&self, sosl: &str) -> Result<Value, ForceError> {
        let sosl = require_text("search", Some(sosl))?;
        self.get("search", &[("q", sosl.to_string())]).await
    }

    pub async fn create(&self, object_name: &str, data: &Map<String, Value>) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        ensure_data(data)?;

        let body = Value::Object(data.clone());
        let created =
            self.execute(Method::POST, &format!("sobjects/{object_name}"), &[], Some(&body)).await?;
        info!(
            event_name = "salesforce.record.created",
            object = %object_name,
            id = created.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
            "record created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        object_name: &str,
        record_id: Option<&str>,
        data: &Map<String, Value>,
    ) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        let record_id = validate_record_id(require_text("record_id", record_id)?)?;
        ensure_data(data)?;

        let body = Value::Object(data.clone());
        self.execute(Method::PATCH, &format!("sobjects/{object_name}/{record_id}"), &[], Some(&body))
            .await?;
        info!(event_name = "salesforce.record.updated", object = %object_name, id = %record_id, "record updated");
        Ok(json!({ "success": true, "id": record_id }))
    }

    pub async fn delete(&self, object_name: &str, record_id: Option<&str>) -> Result<Value, ForceError> {
        let object_name = validate_object_name(object_name)?;
        let record_id = validate_record_id(require_text("record_id", record_id)?)?;

        self.execute(Method::DELETE, &format!("sobjects/{object_name}/{record_id}"), &[], None).await?;
        info!(event_name = "salesforce.record.deleted", object = %object_name, id = %record_id, "record deleted");
        Ok(json!({ "success": true, "id": record_id }))
    }
}

fn ensure_data(data: &Map<String, Value>) -> Result<(), ForceError> {
    if data.is_empty() {
        return Err(ForceError::validation("`data` must contain at least one field"));
    }
    for field in data.keys() {
        validate_field_path(field)?;
    }
    Ok(())
}
