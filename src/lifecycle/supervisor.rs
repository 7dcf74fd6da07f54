//! Task supervision for a running proxy.
//!
//! Shutdown order matters: the server drains in-flight exchanges first,
//! and those exchanges still push records. The flusher therefore has its
//! own stop signal, raised only after the server has returned.

use tokio::net::TcpListener;

use crate::audit::{BatchWriter, RetentionPruner};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;

/// Run the server with its background tasks until `shutdown` fires.
///
/// Returns once the server has drained and the final flush has run.
pub async fn serve(
    server: HttpServer,
    listener: TcpListener,
    writer: BatchWriter,
    pruner: RetentionPruner,
    shutdown: Shutdown,
) -> Result<(), std::io::Error> {
    let writer_stop = Shutdown::new();
    let writer_task = tokio::spawn(writer.run(writer_stop.subscribe()));
    let pruner_task = tokio::spawn(pruner.run(shutdown.subscribe()));

    let result = server.run(listener, shutdown.subscribe()).await;

    // The server may also have exited on its own (listener error).
    shutdown.trigger();
    if let Err(e) = pruner_task.await {
        tracing::error!(error = %e, "Retention pruner task failed");
    }

    writer_stop.trigger();
    if let Err(e) = writer_task.await {
        tracing::error!(error = %e, "Batch writer task failed");
    }

    result
}
