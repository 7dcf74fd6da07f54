//! Audit records.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::value::Value;
use crate::routing::ServiceClass;

/// One completed request/response exchange.
///
/// Built once the backend response has fully streamed to the client and
/// never mutated afterwards, except for redaction in the flusher.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogRecord {
    pub id: Uuid,
    pub service: ServiceClass,
    /// Time the request was accepted.
    pub timestamp: DateTime<Utc>,
    pub method: String,
    /// Request target as received (path and query).
    pub url: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub request_headers: Value,
    /// `None` when the body exceeded the logging ceiling.
    pub request_body: Option<Bytes>,
    pub response_headers: Value,
    pub response_body: Option<Bytes>,
}

impl RequestLogRecord {
    /// Lowercased `content-type` of the request, if present.
    pub fn request_content_type(&self) -> Option<String> {
        self.request_headers
            .get("content-type")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
    }
}

/// Type tag of a flattened value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyValueType {
    String,
    Number,
    Boolean,
    Datetime,
    /// Marker for `null` leaves.
    Object,
}

impl KeyValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyValueType::String => "string",
            KeyValueType::Number => "number",
            KeyValueType::Boolean => "boolean",
            KeyValueType::Datetime => "datetime",
            KeyValueType::Object => "object",
        }
    }
}

impl fmt::Display for KeyValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed leaf of a JSON request body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyValueRecord {
    pub request_log_id: Uuid,
    #[serde(rename = "type")]
    pub kind: KeyValueType,
    pub key: String,
    pub value: String,
}

impl KeyValueRecord {
    pub fn new(request_log_id: Uuid, kind: KeyValueType, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            request_log_id,
            kind,
            key: key.into(),
            value: value.into(),
        }
    }
}
