//! Audit store backends.
//!
//! The pipeline only needs three operations: append a batch of log records,
//! append a batch of key/value rows, and delete one class's records older
//! than a cutoff (key/value rows go with them).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::audit::record::{KeyValueRecord, RequestLogRecord};
use crate::routing::ServiceClass;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Error raised by a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent storage for the audit trail.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert a batch of log records.
    async fn insert_logs(&self, records: &[RequestLogRecord]) -> Result<()>;

    /// Insert a batch of key/value rows. A row whose `(request_log_id, key)`
    /// already exists replaces it.
    async fn insert_key_values(&self, rows: &[KeyValueRecord]) -> Result<()>;

    /// Delete records of `service` with a timestamp before `cutoff`, along
    /// with their key/value rows. Returns the number of log records deleted.
    async fn delete_older_than(&self, service: ServiceClass, cutoff: DateTime<Utc>) -> Result<u64>;
}
