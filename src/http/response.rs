//! Response handling for request-path failures.
//!
//! # Responsibilities
//! - Map proxy failures to client-visible responses
//!
//! # Design Decisions
//! - Backend failures surface as a generic 500, never retried
//! - Logging and persistence problems are never visible to clients

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body sent when the backend cannot be reached.
pub const BACKEND_FAILURE_BODY: &str = "Internal Server Error";

/// Errors terminated at the proxy boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Connect, DNS or reset before response headers arrived.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("no backend available for service '{0}'")]
    NoBackend(crate::routing::ServiceClass),

    #[error("invalid upstream request: {0}")]
    InvalidUpstreamRequest(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoBackend(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::BackendUnavailable(_) | ProxyError::InvalidUpstreamRequest(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), BACKEND_FAILURE_BODY).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ServiceClass;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::BackendUnavailable("refused".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::NoBackend(ServiceClass::Ui).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
