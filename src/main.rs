//! Audit-logging reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request     ┌─────────┐    ┌──────────┐    ┌──────────────┐
//!     ──────────────────▶│  http   │───▶│ routing  │───▶│load_balancer │──────▶ Backend
//!                        │ server  │    │classifier│    │ least conns  │
//!     Client Response    │         │    └──────────┘    └──────────────┘
//!     ◀──────────────────│ capture │◀────────────────────────────────────────── Backend
//!                        └────┬────┘
//!                             │ record on completion
//!                             ▼
//!                        ┌─────────┐    ┌──────────┐    ┌──────────────┐
//!                        │  queue  │───▶│  writer  │───▶│    store     │◀─── pruner
//!                        └─────────┘    │ redact + │    │ (postgres or │
//!                                       │ flatten  │    │   memory)    │
//!                                       └──────────┘    └──────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use audit_proxy::audit::{BatchWriter, LogQueue, LogStore, MemoryStore, PostgresStore, RetentionPruner};
use audit_proxy::config::{loader, StoreBackend, StoreConfig};
use audit_proxy::lifecycle::{signals, supervisor, Shutdown};
use audit_proxy::observability::{logging, metrics};
use audit_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "audit-proxy")]
#[command(about = "Reverse proxy that keeps an audit trail of every exchange", long_about = None)]
struct Cli {
    /// TOML config file; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = loader::load(cli.config.as_deref())?;

    logging::init(config.observability.log_format);
    tracing::info!("audit-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.store.backend,
        flush_interval_ms = config.pipeline.flush_interval_ms,
        prune_interval_ms = config.pipeline.prune_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = open_store(&config.store).await?;
    let queue = Arc::new(LogQueue::new());
    let shutdown = Shutdown::new();

    let writer = BatchWriter::new(queue.clone(), store.clone(), config.pipeline.clone());
    let pruner = RetentionPruner::new(
        store,
        config.services.clone(),
        Duration::from_millis(config.pipeline.prune_interval_ms),
    );

    tokio::spawn(signals::trigger_on_signal(shutdown.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, queue)?;
    supervisor::serve(server, listener, writer, pruner, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn LogStore>, Box<dyn std::error::Error>> {
    match config.backend {
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(config).await?;
            store.ensure_schema().await?;
            tracing::info!(
                host = %config.host,
                port = config.port,
                database = %config.database,
                "Connected to log store"
            );
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory log store; records are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
