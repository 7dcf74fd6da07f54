//! Retention pruning.
//!
//! Every tick deletes, per service class with a positive retention, the
//! records whose timestamp is older than `now - retention`. One class
//! failing does not stop the others.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::audit::store::LogStore;
use crate::config::ServicesConfig;
use crate::observability::metrics;
use crate::routing::ServiceClass;

/// Outcome of one pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: u64,
    pub failed: Vec<ServiceClass>,
}

pub struct RetentionPruner {
    store: Arc<dyn LogStore>,
    services: ServicesConfig,
    interval: Duration,
}

impl RetentionPruner {
    pub fn new(store: Arc<dyn LogStore>, services: ServicesConfig, interval: Duration) -> Self {
        Self {
            store,
            services,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Retention pruner starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.prune(Utc::now()).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Retention pruner received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Delete expired records as of `now`.
    pub async fn prune(&self, now: DateTime<Utc>) -> PruneReport {
        let mut report = PruneReport::default();

        for class in ServiceClass::ALL {
            let hours = self.services.retention_hours(class);
            if hours <= 0 {
                continue;
            }

            let Some(cutoff) = retention_cutoff(now, hours) else {
                tracing::warn!(service = %class, retention_hours = hours, "Retention out of range, skipping");
                continue;
            };

            match self.store.delete_older_than(class, cutoff).await {
                Ok(rows) => {
                    report.deleted += rows;
                    metrics::record_pruned(class, rows);
                    if rows > 0 {
                        tracing::info!(service = %class, rows, %cutoff, "Pruned expired request logs");
                    }
                }
                Err(e) => {
                    report.failed.push(class);
                    tracing::error!(service = %class, error = %e, "Failed to prune request logs");
                }
            }
        }

        report
    }
}

/// `now - hours`, or `None` if it does not fit.
pub fn retention_cutoff(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(TimeDelta::try_hours(hours)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::queue::tests::record;
    use crate::audit::record::{KeyValueRecord, RequestLogRecord};
    use crate::audit::store::{MemoryStore, Result, StoreError};
    use async_trait::async_trait;

    fn aged(service: ServiceClass, now: DateTime<Utc>, hours: i64) -> RequestLogRecord {
        let mut r = record(service);
        r.timestamp = now - TimeDelta::hours(hours);
        r
    }

    #[tokio::test]
    async fn test_prunes_past_window_only() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let old = aged(ServiceClass::Ui, now, 200);
        let recent = aged(ServiceClass::Ui, now, 100);
        store.insert_logs(&[old.clone(), recent.clone()]).await.unwrap();

        let pruner = RetentionPruner::new(store.clone(), ServicesConfig::default(), Duration::from_secs(60));
        let report = pruner.prune(now).await;

        assert_eq!(report.deleted, 1);
        assert!(store.log(old.id).is_none());
        assert!(store.log(recent.id).is_some());
    }

    #[tokio::test]
    async fn test_zero_retention_is_skipped() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let ancient = aged(ServiceClass::Gprs, now, 10_000);
        store.insert_logs(std::slice::from_ref(&ancient)).await.unwrap();

        let mut services = ServicesConfig::default();
        services.gprs.retention_hours = 0;
        let pruner = RetentionPruner::new(store.clone(), services, Duration::from_secs(60));

        assert_eq!(pruner.prune(now).await.deleted, 0);
        assert!(store.log(ancient.id).is_some());
    }

    #[tokio::test]
    async fn test_retention_is_per_class() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let api = aged(ServiceClass::Api, now, 30);
        let ui = aged(ServiceClass::Ui, now, 30);
        store.insert_logs(&[api.clone(), ui.clone()]).await.unwrap();

        let mut services = ServicesConfig::default();
        services.api.retention_hours = 24;
        let pruner = RetentionPruner::new(store.clone(), services, Duration::from_secs(60));
        pruner.prune(now).await;

        assert!(store.log(api.id).is_none());
        assert!(store.log(ui.id).is_some());
    }

    /// Store whose deletes fail for the `api` class only.
    #[derive(Default)]
    struct BrokenApiStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl LogStore for BrokenApiStore {
        async fn insert_logs(&self, records: &[RequestLogRecord]) -> Result<()> {
            self.inner.insert_logs(records).await
        }

        async fn insert_key_values(&self, rows: &[KeyValueRecord]) -> Result<()> {
            self.inner.insert_key_values(rows).await
        }

        async fn delete_older_than(&self, service: ServiceClass, cutoff: DateTime<Utc>) -> Result<u64> {
            if service == ServiceClass::Api {
                return Err(StoreError::Backend("lock timeout".into()));
            }
            self.inner.delete_older_than(service, cutoff).await
        }
    }

    #[tokio::test]
    async fn test_failure_isolated_per_class() {
        let now = Utc::now();
        let store = Arc::new(BrokenApiStore::default());
        let ui = aged(ServiceClass::Ui, now, 500);
        store.insert_logs(std::slice::from_ref(&ui)).await.unwrap();

        let pruner = RetentionPruner::new(store.clone(), ServicesConfig::default(), Duration::from_secs(60));
        let report = pruner.prune(now).await;

        assert_eq!(report.failed, vec![ServiceClass::Api]);
        assert_eq!(report.deleted, 1);
        assert!(store.inner.log(ui.id).is_none());
    }

    #[test]
    fn test_cutoff_overflow() {
        assert!(retention_cutoff(Utc::now(), i64::MAX).is_none());
    }
}
