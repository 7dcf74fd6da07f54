//! Shutdown ordering: exchanges drained by the server still reach the store.

use std::sync::Arc;
use std::time::Duration;

use audit_proxy::audit::{BatchWriter, LogQueue, LogStore, MemoryStore, RetentionPruner};
use audit_proxy::lifecycle::{supervisor, Shutdown};
use audit_proxy::HttpServer;
use tokio::net::TcpListener;
use tokio::sync::Notify;

mod common;

#[tokio::test]
async fn test_inflight_exchange_is_persisted_on_shutdown() {
    let gate = Arc::new(Notify::new());
    let backend = common::start_gated_backend(gate.clone()).await;
    let config = common::config_for(backend);

    let queue = Arc::new(LogQueue::new());
    let store = Arc::new(MemoryStore::new());
    let server = HttpServer::new(config.clone(), queue.clone()).unwrap();
    let writer = BatchWriter::new(queue.clone(), store.clone() as Arc<dyn LogStore>, config.pipeline.clone());
    let pruner = RetentionPruner::new(
        store.clone() as Arc<dyn LogStore>,
        config.services.clone(),
        Duration::from_secs(3600),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let supervised = tokio::spawn(supervisor::serve(server, listener, writer, pruner, shutdown.clone()));

    let pending = tokio::spawn(async move {
        common::client()
            .get(format!("http://{addr}/dashboard"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Shutdown arrives while the backend is still holding the response
    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;
    gate.notify_one();

    assert_eq!(pending.await.unwrap(), "released");
    tokio::time::timeout(Duration::from_secs(5), supervised)
        .await
        .expect("supervisor did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(store.log_count(), 1);
    assert!(queue.is_empty());
}
