//! Key/value flattening of JSON request bodies.
//!
//! Nested paths are written as `outer[inner][0]`, with every segment
//! percent-encoded the way `encodeURIComponent` does. Only leaves reached
//! through at least one key produce rows.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use uuid::Uuid;

use crate::audit::record::{KeyValueRecord, KeyValueType};
use crate::audit::value::{format_datetime, format_number, Value};

/// Characters escaped in a path segment: everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

/// Flatten `value` into rows for `request_log_id`.
///
/// Rows come out in path order. A path that appears twice keeps the last
/// value.
pub fn flatten(request_log_id: Uuid, value: &Value, prefix: &str) -> Vec<KeyValueRecord> {
    let mut rows = BTreeMap::new();
    collect(request_log_id, value, prefix, &mut rows);
    rows.into_values().collect()
}

fn collect(id: Uuid, value: &Value, key: &str, out: &mut BTreeMap<String, KeyValueRecord>) {
    let child_key = |sub: &str| {
        let sub = encode_segment(sub);
        if key.is_empty() {
            sub
        } else {
            format!("{key}[{sub}]")
        }
    };

    let (kind, rendered) = match value {
        Value::Map(map) => {
            for (sub, child) in map {
                collect(id, child, &child_key(sub), out);
            }
            return;
        }
        Value::List(items) => {
            for (index, child) in items.iter().enumerate() {
                collect(id, child, &child_key(&index.to_string()), out);
            }
            return;
        }
        _ if key.is_empty() => return,
        Value::DateTime(dt) => (KeyValueType::Datetime, format_datetime(dt)),
        Value::String(s) => (KeyValueType::String, s.clone()),
        Value::Number(n) => (KeyValueType::Number, format_number(n)),
        Value::Bool(b) => (KeyValueType::Boolean, b.to_string()),
        Value::Null => (KeyValueType::Object, "null".to_string()),
    };

    out.insert(key.to_string(), KeyValueRecord::new(id, kind, key, rendered));
}
