//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Classify requests, pick a backend, forward and stream both ways
//! - Capture bodies and queue a log record once the response completes
//!
//! # Design Decisions
//! - Response status and headers are relayed as soon as they arrive
//! - The backend connection guard is owned by the exchange tracker, so the
//!   counter drops once both bodies have ended or been abandoned
//! - A record is only queued after both bodies have ended (see `exchange`)
//! - No retries and no per-request timeout

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    response::{IntoResponse, Response},
    Router,
};
use chrono::Utc;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::audit::LogQueue;
use crate::config::{LogLimitsConfig, ProxyConfig, ServicesConfig};
use crate::http::capture::{BodyCapture, CaptureBody};
use crate::http::exchange::{Exchange, ExchangeTracker, PendingRecord};
use crate::http::request::{build_upstream_request, headers_to_value, request_target};
use crate::http::response::ProxyError;
use crate::lifecycle::shutdown;
use crate::load_balancer::{BackendPools, PoolError};
use crate::observability::metrics;
use crate::routing::Classifier;

/// Body type sent to backends.
pub type UpstreamBody = CaptureBody<Body>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub pools: Arc<BackendPools>,
    pub queue: Arc<LogQueue>,
    pub services: Arc<ServicesConfig>,
    pub log_limits: LogLimitsConfig,
    pub client: Client<HttpConnector, UpstreamBody>,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    pools: Arc<BackendPools>,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if any service class has no usable
    /// backend.
    pub fn new(config: ProxyConfig, queue: Arc<LogQueue>) -> Result<Self, PoolError> {
        let pools = Arc::new(BackendPools::from_config(&config.services)?);

        // One fresh backend connection per request.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        let state = AppState {
            classifier: Arc::new(Classifier::default()),
            pools: pools.clone(),
            queue,
            services: Arc::new(config.services.clone()),
            log_limits: config.log_limits.clone(),
            client,
        };

        let router = Self::build_router(state);
        Ok(Self { router, pools })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Backend pools, shared with the running handlers.
    pub fn pools(&self) -> Arc<BackendPools> {
        self.pools.clone()
    }
}

/// Main proxy handler.
/// Classifies the request, selects a backend, and streams it through.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let accepted_at = Utc::now();
    let started = Instant::now();

    let (parts, body) = request.into_parts();
    let target = request_target(&parts.uri).to_string();
    let service = state.classifier.classify(&target);
    let method = parts.method.to_string();

    let Some(guard) = state.pools.acquire(service) else {
        tracing::error!(service = %service, "No backend available");
        metrics::record_request(&method, 503, service, started);
        return ProxyError::NoBackend(service).into_response();
    };

    let logging = state.services.get(service).logging_enabled();
    let request_capture = if logging {
        BodyCapture::new(state.log_limits.request_log_limit)
    } else {
        BodyCapture::disabled()
    };

    let (tracker, request_half) = ExchangeTracker::new();
    let upstream_body = CaptureBody::with_completion(
        body,
        request_capture,
        Box::new(move |request_body| request_half.complete(request_body)),
    );

    let upstream = match build_upstream_request(
        &parts,
        &guard.authority,
        client_addr.ip(),
        upstream_body,
    ) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(service = %service, target = %target, error = %e, "Failed to build upstream request");
            metrics::record_request(&method, e.status().as_u16(), service, started);
            return e.into_response();
        }
    };

    tracing::debug!(
        service = %service,
        backend = %guard.authority,
        method = %method,
        target = %target,
        "Proxying request"
    );

    let response = match state.client.request(upstream).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                service = %service,
                backend = %guard.authority,
                error = %e,
                "Backend request failed"
            );
            let err = ProxyError::BackendUnavailable(e.to_string());
            metrics::record_request(&method, err.status().as_u16(), service, started);
            return err.into_response();
        }
    };

    let (response_parts, incoming) = response.into_parts();

    let record = logging.then(|| PendingRecord {
        queue: state.queue.clone(),
        accepted_at,
        url: target,
        request_headers: headers_to_value(&parts.headers),
        response_headers: headers_to_value(&response_parts.headers),
    });
    let response_capture = if logging {
        BodyCapture::new(state.log_limits.response_log_limit)
    } else {
        BodyCapture::disabled()
    };

    let response_half = tracker.attach(Exchange {
        guard,
        service,
        method,
        status: response_parts.status,
        started,
        record,
    });
    let body = CaptureBody::with_completion(
        incoming,
        response_capture,
        Box::new(move |response_body| response_half.complete(response_body)),
    );

    Response::from_parts(response_parts, Body::new(body))
}

