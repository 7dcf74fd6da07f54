//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use audit_proxy::audit::LogQueue;
use audit_proxy::config::{ProxyConfig, StoreBackend};
use audit_proxy::load_balancer::BackendPools;
use audit_proxy::routing::ServiceClass;
use audit_proxy::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    /// First value of header `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let mut request = ReceivedRequest {
        head: String::from_utf8_lossy(&buf[..head_end]).into_owned(),
        body: Vec::new(),
    };
    let content_length = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    request.body = buf[head_end..head_end + content_length].to_vec();
    Some(request)
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        201 => "201 Created",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

async fn write_response(socket: &mut TcpStream, status: u16, headers: &[(String, String)], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status_line(status),
        body.len()
    );
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(body).await;
    let _ = socket.shutdown().await;
}

/// Start a mock backend on an ephemeral port. `f` maps each request to
/// `(status, headers, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(ReceivedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, Vec<(String, String)>, Vec<u8>)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            let (status, headers, body) = f(request).await;
                            write_response(&mut socket, status, &headers, &body).await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that answers with the request body and reports who it is and
/// what `x-forwarded-for` it received.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    start_programmable_backend(move |request: ReceivedRequest| async move {
        let mut headers = vec![
            ("x-backend".to_string(), name.to_string()),
            ("content-type".to_string(), "application/json".to_string()),
            ("set-cookie".to_string(), "session=abc".to_string()),
        ];
        if let Some(forwarded) = request.header("x-forwarded-for") {
            headers.push(("x-seen-forwarded-for".to_string(), forwarded));
        }
        (200, headers, request.body)
    })
    .await
}

/// Backend that holds every response until `gate` is notified.
pub async fn start_gated_backend(gate: Arc<Notify>) -> SocketAddr {
    start_programmable_backend(move |_request: ReceivedRequest| {
        let gate = gate.clone();
        async move {
            gate.notified().await;
            (200, Vec::new(), b"released".to_vec())
        }
    })
    .await
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Default config with every service class pointed at `backend` and the
/// in-memory store selected.
pub fn config_for(backend: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    for class in ServiceClass::ALL {
        config.services.get_mut(class).backends = backend.to_string();
    }
    config.store.backend = StoreBackend::Memory;
    config
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub queue: Arc<LogQueue>,
    pub pools: Arc<BackendPools>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, target: &str) -> String {
        format!("http://{}{}", self.addr, target)
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let queue = Arc::new(LogQueue::new());
    let server = HttpServer::new(config, queue.clone()).unwrap();
    let pools = server.pools();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        queue,
        pools,
        shutdown,
    }
}

/// Client without connection reuse, matching the proxy's backend side.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
