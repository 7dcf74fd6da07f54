//! Load testing for the reverse proxy.

use std::time::{Duration, Instant};

use audit_proxy::routing::ServiceClass;

mod common;

#[tokio::test]
async fn test_concurrent_requests_are_all_logged() {
    let first = common::start_echo_backend("b1").await;
    let second = common::start_echo_backend("b2").await;

    let mut config = common::config_for(first);
    config.services.api.backends = format!("{first};{second}");
    let proxy = common::start_proxy(config).await;

    let total = 100;
    let client = common::client();
    let start = Instant::now();

    let mut handles = Vec::new();
    for i in 0..total {
        let client = client.clone();
        let url = proxy.url(&format!("/api/v1/items/{i}"));
        handles.push(tokio::spawn(async move {
            let res = client.post(url).body(format!("item-{i}")).send().await.unwrap();
            assert_eq!(res.status(), 200);
            res.text().await.unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), format!("item-{i}"));
    }
    let elapsed = start.elapsed();
    println!("{total} requests in {elapsed:?}");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let records = proxy.queue.drain();
    assert_eq!(records.len(), total);
    assert!(records.iter().all(|r| r.service == ServiceClass::Api));

    for backend in proxy.pools.backends(ServiceClass::Api) {
        assert_eq!(backend.connection_count(), 0);
    }
}
