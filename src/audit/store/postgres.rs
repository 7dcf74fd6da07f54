use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{LogStore, Result};
use crate::audit::record::{KeyValueRecord, RequestLogRecord};
use crate::config::StoreConfig;
use crate::routing::ServiceClass;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS request_logs (
    request_log_id UUID PRIMARY KEY,
    service VARCHAR(32) NOT NULL,
    datetime TIMESTAMPTZ NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    duration DOUBLE PRECISION NOT NULL,
    request_headers JSONB NOT NULL,
    request_body BYTEA,
    response_headers JSONB NOT NULL,
    response_body BYTEA
);
CREATE INDEX IF NOT EXISTS request_logs_service_idx ON request_logs (service);
CREATE INDEX IF NOT EXISTS request_logs_datetime_idx ON request_logs (datetime);
CREATE INDEX IF NOT EXISTS request_logs_url_idx ON request_logs (url);

CREATE TABLE IF NOT EXISTS key_values (
    request_log_id UUID NOT NULL REFERENCES request_logs (request_log_id) ON DELETE CASCADE,
    type VARCHAR(16) NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (request_log_id, key)
);
CREATE INDEX IF NOT EXISTS key_values_key_idx ON key_values (key);
CREATE INDEX IF NOT EXISTS key_values_value_idx ON key_values (value);
"#;

/// Postgres `TEXT` cannot hold NUL; one such value would fail its whole
/// multi-row statement, so NULs are dropped before binding.
pub fn text_value(value: &str) -> String {
    if value.contains('\0') {
        value.replace('\0', "")
    } else {
        value.to_string()
    }
}

/// Postgres-backed audit store.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Open a connection pool for `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    /// Create the audit tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LogStore for PostgresStore {
    async fn insert_logs(&self, records: &[RequestLogRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO request_logs (request_log_id, service, datetime, method, url, status_code, \
             duration, request_headers, request_body, response_headers, response_body) ",
        );
        query.push_values(records, |mut row, record| {
            row.push_bind(record.id)
                .push_bind(record.service.as_str())
                .push_bind(record.timestamp)
                .push_bind(text_value(&record.method))
                .push_bind(text_value(&record.url))
                .push_bind(i32::from(record.status_code))
                .push_bind(record.duration_ms)
                .push_bind(serde_json::Value::from(record.request_headers.clone()))
                .push_bind(record.request_body.as_ref().map(|b| b.to_vec()))
                .push_bind(serde_json::Value::from(record.response_headers.clone()))
                .push_bind(record.response_body.as_ref().map(|b| b.to_vec()));
        });

        query.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_key_values(&self, rows: &[KeyValueRecord]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO key_values (request_log_id, type, key, value) ",
        );
        query.push_values(rows, |mut row, kv| {
            row.push_bind(kv.request_log_id)
                .push_bind(kv.kind.as_str())
                .push_bind(text_value(&kv.key))
                .push_bind(text_value(&kv.value));
        });
        query.push(" ON CONFLICT (request_log_id, key) DO UPDATE SET type = EXCLUDED.type, value = EXCLUDED.value");

        query.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_older_than(&self, service: ServiceClass, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM request_logs WHERE service = $1 AND datetime < $2")
            .bind(service.as_str())
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
