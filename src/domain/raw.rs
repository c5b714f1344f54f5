//! Loosely typed scalar fields as delivered by the exchange REST API.
//!
//! Numeric fields arrive as JSON numbers (occasionally as strings) and ids as
//! integers. Both are kept in their textual form until the preprocessor turns
//! them into domain values.

use crate::domain::Decimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RawFieldError {
    #[error("invalid number in {field}: {value}")]
    Number { field: &'static str, value: String },
    #[error("invalid time in {field}: {value}")]
    Time { field: &'static str, value: String },
    #[error("missing field {0}")]
    Missing(&'static str),
}

/// A JSON number or numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    /// Decimal value of the shortest textual form of the number.
    pub fn to_decimal(&self, field: &'static str) -> Result<Decimal, RawFieldError> {
        let text = match self {
            RawNumber::Number(n) => n.to_string(),
            RawNumber::Text(s) => s.clone(),
        };
        Decimal::from_str_canonical(&text).map_err(|_| RawFieldError::Number { field, value: text })
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

/// An exchange identifier, numeric on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    /// Canonical string form (`123` and `"123"` are the same id).
    pub fn to_canonical(&self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<u64> for RawId {
    fn from(value: u64) -> Self {
        RawId::Number(value)
    }
}

/// Parse an RFC 3339 timestamp with offset, keeping sub-second precision.
pub fn parse_time(field: &'static str, value: &str) -> Result<DateTime<Utc>, RawFieldError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| RawFieldError::Time {
            field,
            value: value.to_string(),
        })
}
