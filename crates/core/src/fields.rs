use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ForceError;

/// Field type tags reported by the sObject describe endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Address,
    #[serde(rename = "anyType")]
    AnyType,
    Base64,
    Boolean,
    Combobox,
    Complexvalue,
    Currency,
    Date,
    Datetime,
    Double,
    Email,
    Encryptedstring,
    Id,
    Int,
    Json,
    Location,
    Long,
    Multipicklist,
    Percent,
    Phone,
    Picklist,
    Reference,
    String,
    Textarea,
    Time,
    Url,
}

impl FieldType {
    pub const ALL: [FieldType; 26] = [
        Self::Address,
        Self::AnyType,
        Self::Base64,
        Self::Boolean,
        Self::Combobox,
        Self::Complexvalue,
        Self::Currency,
        Self::Date,
        Self::Datetime,
        Self::Double,
        Self::Email,
        Self::Encryptedstring,
        Self::Id,
        Self::Int,
        Self::Json,
        Self::Location,
        Self::Long,
        Self::Multipicklist,
        Self::Percent,
        Self::Phone,
        Self::Picklist,
        Self::Reference,
        Self::String,
        Self::Textarea,
        Self::Time,
        Self::Url,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::AnyType => "anyType",
            Self::Base64 => "base64",
            Self::Boolean => "boolean",
            Self::Combobox => "combobox",
            Self::Complexvalue => "complexvalue",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Double => "double",
            Self::Email => "email",
            Self::Encryptedstring => "encryptedstring",
            Self::Id => "id",
            Self::Int => "int",
            Self::Json => "json",
            Self::Location => "location",
            Self::Long => "long",
            Self::Multipicklist => "multipicklist",
            Self::Percent => "percent",
            Self::Phone => "phone",
            Self::Picklist => "picklist",
            Self::Reference => "reference",
            Self::String => "string",
            Self::Textarea => "textarea",
            Self::Time => "time",
            Self::Url => "url",
        }
    }

    /// Parses a caller-supplied list, rejecting the first unknown tag.
    pub fn parse_list<S: AsRef<str>>(values: &[S]) -> Result<Vec<FieldType>, ForceError> {
        values.iter().map(|value| value.as_ref().parse()).collect()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ForceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ALL
            .into_iter()
            .find(|field_type| field_type.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| {
                let known =
                    Self::ALL.iter().map(|field_type| field_type.as_str()).collect::<Vec<_>>();
                ForceError::validation(format!(
                    "unknown field type `{needle}` (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}
