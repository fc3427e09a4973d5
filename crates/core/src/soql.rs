//! SOQL/SOSL assembly.
//!
//! Every caller-supplied string that ends up inside a query passes through one
//! of the guards here: identifiers are validated against Salesforce naming
//! rules and free text is escaped as a string literal, a `LIKE` pattern, or a
//! SOSL search term.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::ForceError;

const DEFAULT_FIELDS: &[&str] = &["Id", "Name"];
const SOSL_RESERVED: &[char] =
    &['?', '&', '|', '!', '{', '}', '[', ']', '(', ')', '^', '~', '*', ':', '\\', '"', '\'', '+', '-'];
const ORDER_KEYWORDS: &[&str] = &["ASC", "DESC", "NULLS", "FIRST", "LAST"];

/// Escapes a value for use inside a single-quoted SOQL string literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{8}' => escaped.push_str("\\b"),
            '\u{c}' => escaped.push_str("\\f"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Renders a quoted SOQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Escapes a value for a `LIKE` pattern; `%` and `_` match literally.
pub fn escape_like(value: &str) -> String {
    escape_literal(value).replace('%', "\\%").replace('_', "\\_")
}

/// Renders `'%value%'` for substring matching.
pub fn contains_pattern(value: &str) -> String {
    format!("'%{}%'", escape_like(value))
}

/// Backslash-escapes SOSL reserved characters in a search term.
pub fn escape_sosl(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if SOSL_RESERVED.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

pub fn validate_object_name(name: &str) -> Result<&str, ForceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ForceError::validation("object name must not be empty"));
    }
    if !is_identifier(name) {
        return Err(ForceError::validation(format!(
            "`{name}` is not a valid Salesforce object name"
        )));
    }
    Ok(name)
}

/// Accepts `Field` and relationship paths such as `Account.Owner.Name`.
pub fn validate_field_path(path: &str) -> Result<&str, ForceError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ForceError::validation("field name must not be empty"));
    }
    if !path.split('.').all(is_identifier) {
        return Err(ForceError::validation(format!("`{path}` is not a valid field name")));
    }
    Ok(path)
}

pub fn validate_alias(alias: &str) -> Result<&str, ForceError> {
    let alias = alias.trim();
    if !is_identifier(alias) {
        return Err(ForceError::validation(format!("`{alias}` is not a valid aggregate alias")));
    }
    Ok(alias)
}

/// Salesforce ids are 15 (case-sensitive) or 18 (case-safe) alphanumerics.
pub fn validate_record_id(id: &str) -> Result<&str, ForceError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ForceError::validation("record id is required"));
    }
    let valid_length = id.len() == 15 || id.len() == 18;
    if !valid_length || !id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ForceError::validation(format!(
            "`{id}` is not a valid Salesforce record id (expected 15 or 18 alphanumeric characters)"
        )));
    }
    Ok(id)
}

/// Accepts ISO dates, ISO datetimes, and named literals like `THIS_QUARTER`
/// or `LAST_N_DAYS:30`.
pub fn validate_date_literal(literal: &str) -> Result<&str, ForceError> {
    let literal = literal.trim();
    if NaiveDate::parse_from_str(literal, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(literal).is_ok()
    {
        return Ok(literal);
    }

    let (name, count) = match literal.split_once(':') {
        Some((name, count)) => (name, Some(count)),
        None => (literal, None),
    };
    let name_ok = !name.is_empty()
        && name.chars().all(|ch| ch.is_ascii_uppercase() || ch == '_')
        && name.chars().any(|ch| ch.is_ascii_uppercase());
    let count_ok = count.map(|n| !n.is_empty() && n.chars().all(|ch| ch.is_ascii_digit()));

    if name_ok && count_ok.unwrap_or(true) {
        Ok(literal)
    } else {
        Err(ForceError::validation(format!(
            "`{literal}` is not a SOQL date literal (e.g. THIS_QUARTER, LAST_N_DAYS:30, 2026-02-01)"
        )))
    }
}

/// Comma-separated field list, e.g. a GROUP BY clause.
pub fn validate_field_list(fields: &str) -> Result<Vec<&str>, ForceError> {
    let parts: Vec<&str> = fields.split(',').map(str::trim).collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ForceError::validation(format!("`{fields}` is not a valid field list")));
    }
    parts.into_iter().map(validate_field_path).collect()
}

/// `Amount DESC NULLS LAST, Name`
pub fn validate_order_by(order_by: &str) -> Result<&str, ForceError> {
    let order_by = order_by.trim();
    for item in order_by.split(',') {
        let mut tokens = item.split_whitespace();
        let Some(field) = tokens.next() else {
            return Err(ForceError::validation(format!("`{order_by}` is not a valid ORDER BY")));
        };
        validate_field_path(field)?;
        if let Some(keyword) =
            tokens.find(|token| !ORDER_KEYWORDS.contains(&token.to_ascii_uppercase().as_str()))
        {
            return Err(ForceError::validation(format!(
                "unexpected `{keyword}` in ORDER BY `{order_by}`"
            )));
        }
    }
    Ok(order_by)
}

/// `SELECT fields FROM object [WHERE ..] [ORDER BY ..] [LIMIT n]`
///
/// `where_clause` is inserted as written; callers compose it from validated
/// identifiers and [`quote_literal`] values.
pub fn build_soql(
    object_name: &str,
    fields: &[&str],
    where_clause: Option<&str>,
    order_by: Option<&str>,
    limit: Option<u32>,
) -> Result<String, ForceError> {
    let object_name = validate_object_name(object_name)?;
    let fields = if fields.is_empty() { DEFAULT_FIELDS } else { fields };
    let fields = fields.iter().map(|field| validate_field_path(field)).collect::<Result<Vec<_>, _>>()?;

    let mut soql = format!("SELECT {} FROM {object_name}", fields.join(", "));
    if let Some(condition) = where_clause.map(str::trim).filter(|value| !value.is_empty()) {
        soql.push_str(" WHERE ");
        soql.push_str(condition);
    }
    if let Some(order_by) = order_by.map(str::trim).filter(|value| !value.is_empty()) {
        soql.push_str(" ORDER BY ");
        soql.push_str(validate_order_by(order_by)?);
    }
    if let Some(limit) = limit {
        soql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(soql)
}

/// One `RETURNING` entry of a SOSL search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoslScope {
    pub object: String,
    pub fields: Vec<String>,
}

impl SoslScope {
    pub fn new(object: impl Into<String>, fields: Vec<String>) -> Self {
        Self { object: object.into(), fields }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoslSearch<'a> {
    pub term: &'a str,
    /// Appends an unescaped `*` so the term matches as a prefix.
    pub prefix_match: bool,
    pub scopes: &'a [SoslScope],
    pub limit: Option<u32>,
}

/// `FIND {term} IN ALL FIELDS RETURNING Obj(fields), ... [LIMIT n]`
pub fn build_sosl(search: &SoslSearch<'_>) -> Result<String, ForceError> {
    let term = search.term.trim();
    if term.is_empty() {
        return Err(ForceError::validation("search term must not be empty"));
    }
    if search.scopes.is_empty() {
        return Err(ForceError::validation("at least one object scope is required"));
    }

    let mut returning = Vec::with_capacity(search.scopes.len());
    for scope in search.scopes {
        let object = validate_object_name(&scope.object)?;
        let fields = if scope.fields.is_empty() {
            vec!["Id"]
        } else {
            scope.fields.iter().map(|field| validate_field_path(field)).collect::<Result<_, _>>()?
        };
        returning.push(format!("{object}({})", fields.join(", ")));
    }

    let wildcard = if search.prefix_match { "*" } else { "" };
    let mut sosl = format!(
        "FIND {{{}{wildcard}}} IN ALL FIELDS RETURNING {}",
        escape_sosl(term),
        returning.join(", ")
    );
    if let Some(limit) = search.limit {
        sosl.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(sosl)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateFunction {
    type Err = ForceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "COUNT" => Ok(Self::Count),
            "SUM" => Ok(Self::Sum),
            "AVG" => Ok(Self::Avg),
            "MIN" => Ok(Self::Min),
            "MAX" => Ok(Self::Max),
            other => Err(ForceError::validation(format!(
                "unsupported aggregate function `{other}` (expected COUNT, SUM, AVG, MIN or MAX)"
            ))),
        }
    }
}

/// A validated `FUNCTION(field) alias` triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub field: String,
    pub alias: String,
}

impl Aggregate {
    pub fn new(
        function: AggregateFunction,
        field: &str,
        alias: Option<&str>,
    ) -> Result<Self, ForceError> {
        let field = validate_field_path(field)?.to_string();
        let alias = match alias.map(str::trim).filter(|alias| !alias.is_empty()) {
            Some(alias) => validate_alias(alias)?.to_string(),
            None => format!("{}_{}", function.as_str(), field.replace('.', "_")),
        };
        Ok(Self { function, field, alias })
    }

    /// Parses loosely-typed caller input; `field` defaults to `Id`.
    pub fn parse(function: &str, field: Option<&str>, alias: Option<&str>) -> Result<Self, ForceError> {
        let function = function.parse()?;
        Self::new(function, field.unwrap_or("Id"), alias)
    }

    pub fn render(&self) -> String {
        format!("{}({}) {}", self.function, self.field, self.alias)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AggregateClauses<'a> {
    pub where_clause: Option<&'a str>,
    pub limit: Option<u32>,
}

/// `SELECT [group_by,] FUNC(field) alias, ... FROM object [WHERE] [GROUP BY] [HAVING] [LIMIT]`
pub fn build_aggregate_soql(
    object_name: &str,
    aggregates: &[Aggregate],
    group_by: Option<&str>,
    having: Option<&str>,
    clauses: AggregateClauses<'_>,
) -> Result<String, ForceError> {
    let object_name = validate_object_name(object_name)?;
    if aggregates.is_empty() {
        return Err(ForceError::validation("at least one aggregate is required"));
    }

    let group_by = match group_by.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Some(validate_field_list(value)?.join(", ")),
        None => None,
    };
    let having = having.map(str::trim).filter(|value| !value.is_empty());
    if having.is_some() && group_by.is_none() {
        return Err(ForceError::validation("HAVING requires a GROUP BY field"));
    }

    let rendered = aggregates.iter().map(Aggregate::render).collect::<Vec<_>>().join(", ");
    let select = match &group_by {
        Some(group_by) => format!("{group_by}, {rendered}"),
        None => rendered,
    };

    let mut soql = format!("SELECT {select} FROM {object_name}");
    if let Some(condition) = clauses.where_clause.map(str::trim).filter(|value| !value.is_empty()) {
        soql.push_str(&format!(" WHERE {condition}"));
    }
    if let Some(group_by) = &group_by {
        soql.push_str(&format!(" GROUP BY {group_by}"));
    }
    if let Some(having) = having {
        soql.push_str(&format!(" HAVING {having}"));
    }
    if let Some(limit) = clauses.limit {
        soql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(soql)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walks a SOQL string and reports whether every single-quoted literal
    /// is closed, honouring backslash escapes.
    fn literals_balanced(soql: &str) -> bool {
        let mut in_literal = false;
        let mut chars = soql.chars();
        while let Some(ch) = chars.next() {
            match (in_literal, ch) {
                (true, '\\') => {
                    chars.next();
                }
                (_, '\'') => in_literal = !in_literal,
                _ => {}
            }
        }
        !in_literal
    }

    #[test]
    fn build_soql_defaults_fields_and_skips_absent_clauses() {
        let soql = build_soql("Account", &[], None, None, None).expect("valid query");
        assert_eq!(soql, "SELECT Id, Name FROM Account");
    }

    #[test]
    fn build_soql_appends_present_clauses_in_order() {
        let soql = build_soql(
            "Opportunity",
            &["Id", "Amount", "Account.Name"],
            Some("IsClosed = false"),
            Some("Amount DESC NULLS LAST"),
            Some(25),
        )
        .expect("valid query");
        assert_eq!(
            soql,
            "SELECT Id, Amount, Account.Name FROM Opportunity WHERE IsClosed = false \
             ORDER BY Amount DESC NULLS LAST LIMIT 25"
        );
    }

    #[test]
    fn build_soql_rejects_empty_object() {
        let error = build_soql("  ", &[], None, None, None).expect_err("empty object");
        assert_eq!(error.kind(), "validation_error");
    }

    #[test]
    fn build_soql_rejects_injected_field() {
        assert!(build_soql("Account", &["Id FROM User --"], None, None, None).is_err());
        assert!(build_soql("Account", &["Id"], None, Some("Name; DELETE"), None).is_err());
    }

    #[test]
    fn quote_in_literal_is_escaped() {
        let term = "O'Brien's \\ Partners";
        let soql = build_soql(
            "Account",
            &["Id"],
            Some(&format!("Name LIKE {}", contains_pattern(term))),
            None,
            None,
        )
        .expect("valid query");

        assert!(soql.contains("O\\'Brien\\'s \\\\ Partners"));
        assert!(literals_balanced(&soql));
    }

    #[test]
    fn injection_attempt_stays_inside_literal() {
        let hostile = "x' OR Name != '";
        let soql = format!("SELECT Id FROM Account WHERE Name = {}", quote_literal(hostile));
        assert!(literals_balanced(&soql));
        assert!(soql.ends_with("'x\\' OR Name != \\''"));
    }

    #[test]
    fn like_wildcards_match_literally() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn sosl_escapes_reserved_characters() {
        let scopes = [SoslScope::new("Account", vec!["Name".into(), "Phone".into()])];
        let sosl = build_sosl(&SoslSearch {
            term: "Smith & O'Neil",
            prefix_match: true,
            scopes: &scopes,
            limit: Some(10),
        })
        .expect("valid search");

        assert_eq!(
            sosl,
            "FIND {Smith \\& O\\'Neil*} IN ALL FIELDS RETURNING Account(Name, Phone) LIMIT 10"
        );
    }

    #[test]
    fn sosl_requires_term_and_scope() {
        let scopes = [SoslScope::new("Lead", Vec::new())];
        let empty_term = SoslSearch { term: " ", prefix_match: false, scopes: &scopes, limit: None };
        assert!(build_sosl(&empty_term).is_err());

        let no_scope = SoslSearch { term: "acme", prefix_match: false, scopes: &[], limit: None };
        assert!(build_sosl(&no_scope).is_err());

        let search = SoslSearch { term: "acme", prefix_match: false, scopes: &scopes, limit: None };
        assert_eq!(build_sosl(&search).expect("valid"), "FIND {acme} IN ALL FIELDS RETURNING Lead(Id)");
    }

    #[test]
    fn aggregate_clause_per_triple_in_input_order() {
        let aggregates = vec![
            Aggregate::parse("sum", Some("Amount"), Some("TotalValue")).expect("sum"),
            Aggregate::parse("COUNT", None, None).expect("count"),
            Aggregate::parse("avg", Some("Probability"), Some("AvgProb")).expect("avg"),
            Aggregate::parse("max", Some("Account.AnnualRevenue"), None).expect("max"),
        ];
        let soql = build_aggregate_soql(
            "Opportunity",
            &aggregates,
            Some("StageName"),
            None,
            AggregateClauses { where_clause: Some("IsClosed = false"), limit: Some(100) },
        )
        .expect("valid aggregate");

        assert_eq!(
            soql,
            "SELECT StageName, SUM(Amount) TotalValue, COUNT(Id) COUNT_Id, AVG(Probability) AvgProb, \
             MAX(Account.AnnualRevenue) MAX_Account_AnnualRevenue FROM Opportunity \
             WHERE IsClosed = false GROUP BY StageName LIMIT 100"
        );

        let mut cursor = 0;
        for aggregate in &aggregates {
            let clause = aggregate.render();
            assert_eq!(soql.matches(&clause).count(), 1, "{clause} should appear once");
            let position = soql.find(&clause).expect("clause present");
            assert!(position >= cursor, "{clause} out of order");
            cursor = position;
        }
    }

    #[test]
    fn aggregate_rejects_empty_list_and_unknown_function() {
        let error = build_aggregate_soql("Case", &[], None, None, AggregateClauses::default())
            .expect_err("empty aggregates");
        assert_eq!(error.kind(), "validation_error");

        let error = Aggregate::parse("MEDIAN", Some("Amount"), None).expect_err("median");
        assert!(error.to_string().contains("MEDIAN"));
    }

    #[test]
    fn having_requires_group_by() {
        let aggregates = [Aggregate::parse("COUNT", Some("Id"), Some("Total")).expect("count")];
        let error = build_aggregate_soql(
            "Lead",
            &aggregates,
            None,
            Some("COUNT(Id) > 5"),
            AggregateClauses::default(),
        )
        .expect_err("having without group by");
        assert!(error.to_string().contains("GROUP BY"));

        let soql = build_aggregate_soql(
            "Lead",
            &aggregates,
            Some("LeadSource, Status"),
            Some("COUNT(Id) > 5"),
            AggregateClauses::default(),
        )
        .expect("valid");
        assert_eq!(
            soql,
            "SELECT LeadSource, Status, COUNT(Id) Total FROM Lead GROUP BY LeadSource, Status \
             HAVING COUNT(Id) > 5"
        );
    }

    #[test]
    fn record_ids_and_date_literals() {
        assert!(validate_record_id("001000000000001").is_ok());
        assert!(validate_record_id("001000000000001AAA").is_ok());
        assert!(validate_record_id("001' OR Id != '").is_err());
        assert!(validate_record_id("").is_err());

        for literal in ["THIS_QUARTER", "LAST_N_DAYS:30", "2026-02-01", "2026-02-01T00:00:00Z"] {
            assert!(validate_date_literal(literal).is_ok(), "{literal}");
        }
        for literal in ["this_quarter", "LAST_N_DAYS:", "2026-13-01", "TODAY OR 1=1"] {
            assert!(validate_date_literal(literal).is_err(), "{literal}");
        }
    }
}
