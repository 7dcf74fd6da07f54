//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::ServiceClass;

/// Root configuration for the audit proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Backend pools and retention per service class.
    pub services: ServicesConfig,

    /// Body size ceilings for logging.
    pub log_limits: LogLimitsConfig,

    /// Flush and prune scheduling.
    pub pipeline: PipelineConfig,

    /// Audit store connection.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080"). Host names are resolved.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost:80".to_string(),
        }
    }
}

/// Settings for one service class.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Backend list, `host[:port]` entries separated by `,` or `;`.
    pub backends: String,

    /// Log retention in hours. Zero disables logging and pruning.
    pub retention_hours: i64,
}

impl ServiceConfig {
    fn with_backends(backends: &str) -> Self {
        Self {
            backends: backends.to_string(),
            retention_hours: DEFAULT_RETENTION_HOURS,
        }
    }

    /// Whether requests of this class are recorded at all.
    pub fn logging_enabled(&self) -> bool {
        self.retention_hours > 0
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::with_backends("")
    }
}

/// One week.
pub const DEFAULT_RETENTION_HOURS: i64 = 168;

/// Per-class service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub api: ServiceConfig,
    pub ui: ServiceConfig,
    pub wisensys: ServiceConfig,
    pub novus: ServiceConfig,
    pub comet: ServiceConfig,
    pub gprs: ServiceConfig,
}

impl ServicesConfig {
    pub fn get(&self, class: ServiceClass) -> &ServiceConfig {
        match class {
            ServiceClass::Api => &self.api,
            ServiceClass::Ui => &self.ui,
            ServiceClass::Wisensys => &self.wisensys,
            ServiceClass::Novus => &self.novus,
            ServiceClass::Comet => &self.comet,
            ServiceClass::Gprs => &self.gprs,
        }
    }

    pub fn get_mut(&mut self, class: ServiceClass) -> &mut ServiceConfig {
        match class {
            ServiceClass::Api => &mut self.api,
            ServiceClass::Ui => &mut self.ui,
            ServiceClass::Wisensys => &mut self.wisensys,
            ServiceClass::Novus => &mut self.novus,
            ServiceClass::Comet => &mut self.comet,
            ServiceClass::Gprs => &mut self.gprs,
        }
    }

    /// Retention in hours for `class`.
    pub fn retention_hours(&self, class: ServiceClass) -> i64 {
        self.get(class).retention_hours
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            api: ServiceConfig::with_backends("localhost:8080"),
            ui: ServiceConfig::with_backends("localhost:8090"),
            wisensys: ServiceConfig::with_backends("localhost:9000"),
            novus: ServiceConfig::with_backends("localhost:9001"),
            comet: ServiceConfig::with_backends("localhost:9002"),
            gprs: ServiceConfig::with_backends("localhost:9003"),
        }
    }
}

/// Body size ceilings for logging. Bodies over the ceiling are recorded
/// as null; proxying always forwards the full body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogLimitsConfig {
    /// Maximum request body bytes kept in a log record.
    pub request_log_limit: usize,

    /// Maximum response body bytes kept in a log record.
    pub response_log_limit: usize,
}

impl Default for LogLimitsConfig {
    fn default() -> Self {
        Self {
            request_log_limit: 1_000_000,
            response_log_limit: 100_000,
        }
    }
}

/// Audit pipeline scheduling and batching.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Interval between queue flushes in milliseconds.
    pub flush_interval_ms: u64,

    /// Interval between retention sweeps in milliseconds.
    pub prune_interval_ms: u64,

    /// Log records per insert statement.
    pub record_batch_size: usize,

    /// Key/value rows per insert statement.
    pub key_value_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 10_000,
            prune_interval_ms: 60_000,
            record_batch_size: 10,
            key_value_batch_size: 100,
        }
    }
}

/// Which store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Audit store connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Pool size for the Postgres store.
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "intabcloud_log".to_string(),
            max_connections: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
