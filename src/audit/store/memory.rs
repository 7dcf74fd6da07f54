use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{LogStore, Result, StoreError};
use crate::audit::record::{KeyValueRecord, RequestLogRecord};
use crate::routing::ServiceClass;

#[derive(Debug, Default)]
struct Tables {
    logs: HashMap<Uuid, RequestLogRecord>,
    key_values: BTreeMap<(Uuid, String), KeyValueRecord>,
}

/// In-memory store (not persistent, for development and tests).
///
/// Enforces the same constraints as the relational schema: unique log ids,
/// key/value rows must reference an existing log, deletes cascade.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_count(&self) -> usize {
        self.lock().logs.len()
    }

    pub fn logs(&self) -> Vec<RequestLogRecord> {
        let mut logs: Vec<_> = self.lock().logs.values().cloned().collect();
        logs.sort_by_key(|r| r.timestamp);
        logs
    }

    pub fn log(&self, id: Uuid) -> Option<RequestLogRecord> {
        self.lock().logs.get(&id).cloned()
    }

    /// Key/value rows of one log, ordered by key.
    pub fn key_values(&self, id: Uuid) -> Vec<KeyValueRecord> {
        self.lock()
            .key_values
            .values()
            .filter(|kv| kv.request_log_id == id)
            .cloned()
            .collect()
    }

    pub fn key_value_count(&self) -> usize {
        self.lock().key_values.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert_logs(&self, records: &[RequestLogRecord]) -> Result<()> {
        let mut tables = self.lock();
        // All-or-nothing, like a single INSERT statement
        if let Some(dup) = records.iter().find(|r| tables.logs.contains_key(&r.id)) {
            return Err(StoreError::Backend(format!("duplicate request log id {}", dup.id)));
        }
        for record in records {
            tables.logs.insert(record.id, record.clone());
        }
        Ok(())
    }

    async fn insert_key_values(&self, rows: &[KeyValueRecord]) -> Result<()> {
        let mut tables = self.lock();
        if let Some(orphan) = rows.iter().find(|kv| !tables.logs.contains_key(&kv.request_log_id)) {
            return Err(StoreError::Backend(format!(
                "key/value row references missing request log {}",
                orphan.request_log_id
            )));
        }
        for row in rows {
            tables
                .key_values
                .insert((row.request_log_id, row.key.clone()), row.clone());
        }
        Ok(())
    }

    async fn delete_older_than(&self, service: ServiceClass, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.lock();
        let expired: Vec<Uuid> = tables
            .logs
            .values()
            .filter(|r| r.service == service && r.timestamp < cutoff)
            .map(|r| r.id)
            .collect();

        for id in &expired {
            tables.logs.remove(id);
        }
        tables
            .key_values
            .retain(|(log_id, _), _| !expired.contains(log_id));

        Ok(expired.len() as u64)
    }
}
