//! Periodic batch writer.
//!
//! # Responsibilities
//! - Drain the queue on every tick
//! - Redact request headers and JSON request bodies
//! - Derive key/value rows from JSON request bodies
//! - Persist records and rows in bounded batches
//!
//! # Design Decisions
//! - A failed batch is logged and skipped; the loop keeps ticking
//! - Key/value rows of a failed record batch are dropped with it
//! - On shutdown one final flush runs before the task exits

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::audit::flatten::flatten;
use crate::audit::queue::LogQueue;
use crate::audit::record::{KeyValueRecord, RequestLogRecord};
use crate::audit::redact::redact;
use crate::audit::store::LogStore;
use crate::audit::value::Value;
use crate::config::PipelineConfig;
use crate::observability::metrics;

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub drained: usize,
    pub persisted: usize,
    pub key_values: usize,
    pub failed_batches: usize,
}

pub struct BatchWriter {
    queue: Arc<LogQueue>,
    store: Arc<dyn LogStore>,
    config: PipelineConfig,
}

impl BatchWriter {
    pub fn new(queue: Arc<LogQueue>, store: Arc<dyn LogStore>, config: PipelineConfig) -> Self {
        Self { queue, store, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.config.flush_interval_ms, "Log flusher starting");

        let mut ticker = time::interval(Duration::from_millis(self.config.flush_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                }
                _ = shutdown.recv() => {
                    let report = self.flush().await;
                    tracing::info!(persisted = report.persisted, "Log flusher drained queue on shutdown");
                    break;
                }
            }
        }
    }

    /// Drain the queue and persist everything in it.
    pub async fn flush(&self) -> FlushReport {
        let mut records = self.queue.drain();
        let mut report = FlushReport {
            drained: records.len(),
            ..FlushReport::default()
        };
        if records.is_empty() {
            return report;
        }

        let rows: Vec<Vec<KeyValueRecord>> = records.iter_mut().map(prepare_record).collect();

        let batch_size = self.config.record_batch_size.max(1);
        let mut pending_rows = Vec::new();
        for (batch, batch_rows) in records.chunks(batch_size).zip(rows.chunks(batch_size)) {
            match self.store.insert_logs(batch).await {
                Ok(()) => {
                    report.persisted += batch.len();
                    pending_rows.extend(batch_rows.iter().flatten().cloned());
                }
                Err(e) => {
                    report.failed_batches += 1;
                    metrics::record_batch_error("request_logs");
                    tracing::error!(error = %e, records = batch.len(), "Failed to persist request log batch");
                }
            }
        }

        for batch in pending_rows.chunks(self.config.key_value_batch_size.max(1)) {
            match self.store.insert_key_values(batch).await {
                Ok(()) => report.key_values += batch.len(),
                Err(e) => {
                    report.failed_batches += 1;
                    metrics::record_batch_error("key_values");
                    tracing::error!(error = %e, rows = batch.len(), "Failed to persist key/value batch");
                }
            }
        }

        metrics::record_persisted(report.persisted);
        tracing::debug!(
            drained = report.drained,
            persisted = report.persisted,
            key_values = report.key_values,
            failed_batches = report.failed_batches,
            "Flushed request logs"
        );
        report
    }
}

/// Redact a record in place and derive its key/value rows.
///
/// Request headers are always redacted. A JSON request body that parses is
/// redacted, flattened, and if anything was masked, stored re-serialized so
/// the raw secret never reaches the store. Bodies that fail to parse are
/// kept as-is and produce no rows.
pub fn prepare_record(record: &mut RequestLogRecord) -> Vec<KeyValueRecord> {
    redact(&mut record.request_headers);

    let Some(body) = record.request_body.as_ref() else {
        return Vec::new();
    };
    let is_json = record
        .request_content_type()
        .is_some_and(|ct| ct.starts_with("application/json"));
    if !is_json {
        return Vec::new();
    }

    let mut value = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(json) => Value::from(json),
        Err(e) => {
            tracing::debug!(request_log_id = %record.id, error = %e, "Request body is not valid JSON");
            return Vec::new();
        }
    };

    if redact(&mut value) > 0 {
        match serde_json::to_vec(&serde_json::Value::from(value.clone())) {
            Ok(bytes) => record.request_body = Some(Bytes::from(bytes)),
            // Never keep the unredacted original
            Err(_) => record.request_body = None,
        }
    }

    flatten(record.id, &value, "")
}
