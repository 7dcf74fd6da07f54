//! Request handling and transformation.
//!
//! # Responsibilities
//! - Build the outbound request for the selected backend
//! - Append the client address to `x-forwarded-for`
//! - Snapshot header maps for the audit log
//!
//! # Design Decisions
//! - Method, path and query pass through unchanged
//! - Backends are always spoken to over HTTP/1.1
//! - Client headers are copied verbatim (including `Host`)

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    uri::{PathAndQuery, Uri},
    Request,
};

use crate::audit::Value;
use crate::http::response::ProxyError;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Request target (path plus query) as received; `/` when absent.
pub fn request_target(uri: &Uri) -> &str {
    uri.path_and_query().map(PathAndQuery::as_str).unwrap_or("/")
}

/// Build the request forwarded to `authority` (`host:port`).
pub fn build_upstream_request<B>(
    parts: &Parts,
    authority: &str,
    client_ip: IpAddr,
    body: B,
) -> Result<Request<B>, ProxyError> {
    let uri = Uri::builder()
        .scheme("http")
        .authority(authority)
        .path_and_query(request_target(&parts.uri))
        .build()
        .map_err(|e| ProxyError::InvalidUpstreamRequest(e.to_string()))?;

    let mut headers = parts.headers.clone();
    append_forwarded_for(&mut headers, client_ip);

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(body)
        .map_err(|e| ProxyError::InvalidUpstreamRequest(e.to_string()))?;
    *request.headers_mut() = headers;

    Ok(request)
}

fn append_forwarded_for(headers: &mut HeaderMap, client_ip: IpAddr) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {client_ip}"),
        _ => client_ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
}

/// Header map as a value tree: one string per header, or a list when the
/// header repeats.
pub fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = BTreeMap::new();
    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::List(values)
        };
        map.insert(name.as_str().to_string(), value);
    }
    Value::Map(map)
}
