//! In-memory log ingestion queue.

use std::sync::{Mutex, MutexGuard};

use crate::audit::record::RequestLogRecord;
use crate::observability::metrics;

/// Unbounded buffer between request handlers and the flusher.
///
/// Handlers only push; the flusher only drains. A drain swaps out the whole
/// buffer, so records pushed while a flush is running wait for the next one.
#[derive(Debug, Default)]
pub struct LogQueue {
    records: Mutex<Vec<RequestLogRecord>>,
}

impl LogQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: RequestLogRecord) {
        metrics::record_enqueued(record.service);
        self.lock().push(record);
    }

    /// Take everything currently queued.
    pub fn drain(&self) -> Vec<RequestLogRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RequestLogRecord>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audit::value::Value;
    use crate::routing::ServiceClass;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    pub(crate) fn record(service: ServiceClass) -> RequestLogRecord {
        RequestLogRecord {
            id: Uuid::new_v4(),
            service,
            timestamp: Utc::now(),
            method: "GET".into(),
            url: "/".into(),
            status_code: 200,
            duration_ms: 1.0,
            request_headers: Value::Map(BTreeMap::new()),
            request_body: None,
            response_headers: Value::Map(BTreeMap::new()),
            response_body: None,
        }
    }

    #[test]
    fn test_drain_takes_snapshot() {
        let queue = LogQueue::new();
        queue.push(record(ServiceClass::Api));
        queue.push(record(ServiceClass::Ui));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());

        queue.push(record(ServiceClass::Gprs));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain()[0].service, ServiceClass::Gprs);
    }
}
