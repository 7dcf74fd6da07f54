//! Audit trail subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy engine (response stream ended)
//!     → queue.rs (push RequestLogRecord)
//!
//! Every flush tick (writer.rs):
//!     drain queue
//!     → redact.rs (request headers, JSON request bodies)
//!     → flatten.rs (JSON body → key/value rows)
//!     → store (records in batches of 10, rows in batches of 100)
//!
//! Every prune tick (pruner.rs):
//!     for each class with retention > 0
//!     → store.delete_older_than(class, now - retention)
//! ```
//!
//! # Design Decisions
//! - Best effort: records still queued when the process dies are lost
//! - Background failures are logged, never surfaced to requests
//! - Response data is stored verbatim, never redacted

pub mod flatten;
pub mod pruner;
pub mod queue;
pub mod record;
pub mod redact;
pub mod store;
pub mod value;
pub mod writer;

pub use pruner::RetentionPruner;
pub use queue::LogQueue;
pub use record::{KeyValueRecord, KeyValueType, RequestLogRecord};
pub use store::{LogStore, MemoryStore, PostgresStore, StoreError};
pub use value::Value;
pub use writer::BatchWriter;
