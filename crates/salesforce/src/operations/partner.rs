use std::cmp::Ordering;
use std::collections::HashSet;

use forcelink_core::errors::ForceError;
use forcelink_core::soql::{build_soql, contains_pattern, quote_literal, validate_field_path};
use serde::Serialize;
use serde_json::{json, Value};

use super::{positive_limit, require_text};
use crate::client::SalesforceClient;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PartnerMatch {
    pub id: String,
    pub name: String,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

impl PartnerMatch {
    fn from_record(record: &Value) -> Option<Self> {
        let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: text("Id")?,
            name: text("Name")?,
            country: text("BillingCountry"),
            account_type: text("Type"),
        })
    }
}

impl SalesforceClient {
    /// Partner accounts whose name contains `search_term`, exact matches first.
    ///
    /// Exact names are fetched by their own query so a page of earlier-sorting
    /// substring matches cannot push them past `limit`.
    pub async fn find_partner(&self, search_term: &str, limit: Option<u32>) -> Result<Value, ForceError> {
        let term = require_text("search_term", Some(search_term))?;
        let indicator = validate_field_path(&self.settings().partner_indicator_field)?;
        let limit = positive_limit(limit, self.settings().limits.find_partner)?;

        let partner_query = |name_filter: String| {
            build_soql(
                "Account",
                &["Id", "Name", "BillingCountry", "Type"],
                Some(&format!("{name_filter} AND {indicator} = true")),
                Some("Name ASC"),
                Some(limit),
            )
        };
        let exact = self.query_records(&partner_query(format!("Name = {}", quote_literal(term)))?).await?;
        let similar =
            self.query_records(&partner_query(format!("Name LIKE {}", contains_pattern(term)))?).await?;

        let mut seen = HashSet::new();
        let candidates = exact
            .iter()
            .chain(similar.iter())
            .filter_map(PartnerMatch::from_record)
            .filter(|partner| seen.insert(partner.id.clone()))
            .collect();
        let mut partners = rank_partners(term, candidates);
        partners.truncate(limit as usize);

        Ok(json!({ "searchTerm": term, "totalSize": partners.len(), "partners": partners }))
    }
}

fn rank_partners(term: &str, mut partners: Vec<PartnerMatch>) -> Vec<PartnerMatch> {
    let needle = term.to_lowercase();
    partners.sort_by(|left, right| {
        let left_exact = left.name.to_lowercase() == needle;
        let right_exact = right.name.to_lowercase() == needle;
        match (left_exact, right_exact) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
        }
    });
    partners
}
