//! Exchange completion tracking.
//!
//! # Responsibilities
//! - Hold the backend connection guard for the lifetime of an exchange
//! - Wait for both the request and the response body to end
//! - Queue the log record once both sides are resolved
//!
//! # Design Decisions
//! - Each body reports through an [`ExchangeHalf`]; dropping a half without
//!   completing it marks that side as aborted
//! - Aborted response: no record. Aborted request: record without a
//!   request body, never a truncated one
//! - The guard is released when the last side resolves

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use axum::http::StatusCode;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audit::{LogQueue, RequestLogRecord, Value};
use crate::load_balancer::BackendConnectionGuard;
use crate::observability::metrics;
use crate::routing::ServiceClass;

/// Everything needed to build a log record besides the bodies.
pub struct PendingRecord {
    pub queue: Arc<LogQueue>,
    pub accepted_at: DateTime<Utc>,
    pub url: String,
    pub request_headers: Value,
    pub response_headers: Value,
}

/// One exchange whose response headers have arrived.
pub struct Exchange {
    pub guard: BackendConnectionGuard,
    pub service: ServiceClass,
    pub method: String,
    pub status: StatusCode,
    pub started: Instant,
    /// `None` when logging is disabled for the service.
    pub record: Option<PendingRecord>,
}

#[derive(Debug)]
enum Side {
    Streaming,
    Complete(Option<Bytes>),
    Aborted,
}

impl Side {
    fn is_resolved(&self) -> bool {
        !matches!(self, Side::Streaming)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Request,
    Response,
}

struct JoinState {
    exchange: Option<Exchange>,
    request: Side,
    response: Side,
}

type SharedState = Arc<Mutex<JoinState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, JoinState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Joins the two body streams of one exchange.
///
/// Created before the request is forwarded; the [`Exchange`] is attached
/// once the response headers arrive. Dropping the tracker unattached (the
/// backend never answered) discards the exchange silently.
pub struct ExchangeTracker {
    state: SharedState,
}

impl ExchangeTracker {
    /// Start tracking. Returns the half for the request body.
    pub fn new() -> (Self, ExchangeHalf) {
        let state = Arc::new(Mutex::new(JoinState {
            exchange: None,
            request: Side::Streaming,
            response: Side::Streaming,
        }));
        let request = ExchangeHalf {
            state: state.clone(),
            direction: Direction::Request,
            reported: false,
        };
        (Self { state }, request)
    }

    /// Attach the exchange. Returns the half for the response body.
    pub fn attach(self, exchange: Exchange) -> ExchangeHalf {
        lock(&self.state).exchange = Some(exchange);
        ExchangeHalf {
            state: self.state,
            direction: Direction::Response,
            reported: false,
        }
    }
}

/// Completion handle for one body of an exchange.
pub struct ExchangeHalf {
    state: SharedState,
    direction: Direction,
    reported: bool,
}

impl ExchangeHalf {
    /// The body streamed to its end; `body` is what was captured.
    pub fn complete(mut self, body: Option<Bytes>) {
        self.reported = true;
        self.resolve(Side::Complete(body));
    }

    fn resolve(&self, side: Side) {
        let finished = {
            let mut state = lock(&self.state);
            match self.direction {
                Direction::Request => state.request = side,
                Direction::Response => state.response = side,
            }
            if state.request.is_resolved() && state.response.is_resolved() {
                state.exchange.take().map(|exchange| {
                    let request = std::mem::replace(&mut state.request, Side::Aborted);
                    let response = std::mem::replace(&mut state.response, Side::Aborted);
                    (exchange, request, response)
                })
            } else {
                None
            }
        };

        if let Some((exchange, request, response)) = finished {
            finish(exchange, request, response);
        }
    }
}

impl Drop for ExchangeHalf {
    fn drop(&mut self) {
        if !self.reported {
            self.resolve(Side::Aborted);
        }
    }
}

fn finish(exchange: Exchange, request: Side, response: Side) {
    let Exchange {
        guard,
        service,
        method,
        status,
        started,
        record,
    } = exchange;

    let response_body = match response {
        Side::Complete(body) => body,
        Side::Streaming | Side::Aborted => {
            tracing::debug!(service = %service, backend = %guard.authority, "Exchange aborted before the response completed");
            return;
        }
    };
    metrics::record_request(&method, status.as_u16(), service, started);

    let Some(pending) = record else {
        return;
    };
    let request_body = match request {
        Side::Complete(body) => body,
        Side::Streaming | Side::Aborted => None,
    };

    pending.queue.push(RequestLogRecord {
        id: Uuid::new_v4(),
        service,
        timestamp: pending.accepted_at,
        method,
        url: pending.url,
        status_code: status.as_u16(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        request_headers: pending.request_headers,
        request_body,
        response_headers: pending.response_headers,
        response_body,
    });
}
