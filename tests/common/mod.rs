//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use audit_proxy::audit::AuditStore;
use audit_proxy::config::GatewayConfig;
use audit_proxy::http::HttpServer;
use audit_proxy::lifecycle::Shutdown;
use axum::http::StatusCode;
use axum::Router;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Serve an axum router on an ephemeral port, returning its address.
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A catch-all upstream returning a fixed status and body, counting hits.
#[allow(dead_code)]
pub async fn spawn_counting_upstream(
    status: u16,
    body: &'static str,
) -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let router = Router::new().fallback(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (StatusCode::from_u16(status).unwrap(), body)
        }
    });
    (spawn_upstream(router).await, hits)
}

/// An upstream that leaves its first `failures` connections hanging without
/// a response (the proxy's read timeout fires and classifies the attempt as
/// a transport failure), then serves a fixed 200 to later connections.
pub async fn spawn_flaky_upstream(
    failures: u32,
    body: &'static str,
) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        if attempt < failures {
                            // Hold the connection open silently until the
                            // client gives up on it.
                            tokio::time::sleep(Duration::from_secs(30)).await;
                        } else {
                            let response = format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                body.len(),
                                body
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Start the proxy on an ephemeral port with an in-memory audit store.
///
/// Returns the proxy address, a handle on the shared audit store, and the
/// shutdown coordinator keeping the server alive.
pub async fn spawn_gateway(
    configure: impl FnOnce(&mut GatewayConfig),
) -> (SocketAddr, Arc<AuditStore>, Shutdown) {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    configure(&mut config);

    let store = Arc::new(AuditStore::open(":memory:").unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(config, store.clone()).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, store, shutdown)
}

/// Poll the audit store until `expected` records exist; the write is
/// fire-and-forget so it races the response.
pub async fn wait_for_audit(store: &AuditStore, expected: i64) {
    for _ in 0..100 {
        if store.count().unwrap() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} audit record(s), found {}",
        expected,
        store.count().unwrap()
    );
}

/// Reserve a port nothing listens on (connect attempts are refused).
pub fn dead_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
