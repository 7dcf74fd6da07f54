//! Sensitive-data redaction.
//!
//! Map keys whose names look like credentials have their values replaced by
//! [`REDACTED`]. Lists are walked element-wise; list indices are never
//! tested. The walk is idempotent.

use std::sync::LazyLock;

use regex::RegexSet;

use crate::audit::value::Value;

/// Replacement for every masked value.
pub const REDACTED: &str = "<hidden>";

static SENSITIVE_KEYS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)api[-_]?key",
        r"(?i)password",
        r"(?i)cookie",
        r"(?i)authorization",
        r"(?i)refresh[-_]?token",
        r"(?i)access[-_]?token",
    ])
    .expect("sensitive key patterns are valid")
});

/// Whether `key` names a sensitive field.
pub fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS.is_match(key)
}

/// Mask sensitive values in place. Returns the number of values masked.
pub fn redact(value: &mut Value) -> usize {
    match value {
        Value::Map(map) => {
            let mut masked = 0;
            for (key, child) in map.iter_mut() {
                if is_sensitive(key) {
                    *child = Value::String(REDACTED.to_string());
                    masked += 1;
                } else {
                    masked += redact(child);
                }
            }
            masked
        }
        Value::List(items) => items.iter_mut().map(redact).sum(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_redaction() {
        let mut value = Value::from(json!({
            "password": "p",
            "nested": {"apiKey": "k", "ok": "v"}
        }));

        assert_eq!(redact(&mut value), 2);
        assert_eq!(
            serde_json::Value::from(value.clone()),
            json!({"password": "<hidden>", "nested": {"apiKey": "<hidden>", "ok": "v"}})
        );

        // Second pass leaves the tree as it was
        let before = value.clone();
        redact(&mut value);
        assert_eq!(value, before);
    }

    #[test]
    fn test_whole_subtree_replaced() {
        let mut value = Value::from(json!({"Authorization": {"scheme": "Bearer", "token": "t"}}));
        redact(&mut value);
        assert_eq!(serde_json::Value::from(value), json!({"Authorization": "<hidden>"}));
    }

    #[test]
    fn test_lists_walked_without_index_checks() {
        let mut value = Value::from(json!([
            {"user_password": "x"},
            {"refresh_token": "y", "accessToken": "z"},
            "cookie"
        ]));
        assert_eq!(redact(&mut value), 3);
        assert_eq!(
            serde_json::Value::from(value),
            json!([
                {"user_password": "<hidden>"},
                {"refresh_token": "<hidden>", "accessToken": "<hidden>"},
                "cookie"
            ])
        );
    }

    #[test]
    fn test_key_patterns() {
        for key in ["x-api-key", "API_KEY", "apikey", "Set-Cookie", "PASSWORD_HASH", "refreshToken"] {
            assert!(is_sensitive(key), "{key} should be sensitive");
        }
        for key in ["api", "token", "username", "content-type", "key"] {
            assert!(!is_sensitive(key), "{key} should not be sensitive");
        }
    }
}
