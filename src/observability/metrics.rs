//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, service
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_backend_active_connections` (gauge): in-flight per backend
//! - `audit_records_enqueued_total` (counter): records handed to the queue
//! - `audit_records_persisted_total` (counter): records written by the flusher
//! - `audit_batch_errors_total` (counter): failed store batches by table
//! - `audit_records_pruned_total` (counter): rows deleted by retention
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::ServiceClass;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, service: ServiceClass, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.as_str(),
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "service" => service.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_backend_connections(backend: &str, count: usize) {
    metrics::gauge!("proxy_backend_active_connections", "backend" => backend.to_string())
        .set(count as f64);
}

pub fn record_enqueued(service: ServiceClass) {
    metrics::counter!("audit_records_enqueued_total", "service" => service.as_str()).increment(1);
}

pub fn record_persisted(count: usize) {
    metrics::counter!("audit_records_persisted_total").increment(count as u64);
}

pub fn record_batch_error(table: &'static str) {
    metrics::counter!("audit_batch_errors_total", "table" => table).increment(1);
}

pub fn record_pruned(service: ServiceClass, rows: u64) {
    metrics::counter!("audit_records_pruned_total", "service" => service.as_str()).increment(rows);
}
