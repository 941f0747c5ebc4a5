//! Customer resource data model
//!
//! `Customer` carries an integer identifier plus an opaque set of fields that
//! are passed through untouched. `ErrorPayload` is the JSON body of every
//! failure response.

use hyper::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Customer record
///
/// Only `customerId` is interpreted; every other JSON field lands in `fields`
/// and is serialized back as-is.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Customer {
    #[serde(rename = "customerId", default, deserialize_with = "nullable_id")]
    pub customer_id: i32,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// An explicit `null` id reads as 0, same as a missing one
fn nullable_id<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
impl Customer {
    pub fn new(customer_id: i32) -> Self {
        Self {
            customer_id,
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }
}

/// Structured error body: `{ "statusCode", "status", "message" }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub status_code: u16,
    pub status: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            status: status_token(status),
            message: message.into(),
        }
    }

    /// Generic 500 body; never carries the underlying failure
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE_MESSAGE)
    }
}

pub const GENERIC_FAILURE_MESSAGE: &str = "Oops, something went wrong!";

/// Upper snake case reason token, e.g. `404` -> `NOT_FOUND`
fn status_token(status: StatusCode) -> String {
    status.canonical_reason().map_or_else(
        || status.as_u16().to_string(),
        |reason| {
            reason
                .chars()
                .map(|c| match c {
                    ' ' | '-' => '_',
                    c => c.to_ascii_uppercase(),
                })
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect()
        },
    )
}
