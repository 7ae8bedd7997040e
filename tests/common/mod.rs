//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use traffic_tap::{HttpServer, ProxyConfig, Shutdown, TapConfig};

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A report as seen by the collector.
#[derive(Debug)]
pub struct Received {
    pub content_type: Option<String>,
    pub json: Value,
}

/// Mock collector answering every report with `status` after `delay`.
pub struct Collector {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
    pub reports: mpsc::UnboundedReceiver<Received>,
}

impl Collector {
    pub async fn start(status: StatusCode, delay: Duration) -> Self {
        let (tx, reports) = mpsc::unbounded_channel();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        let app = Router::new().route(
            "/api/report",
            post(move |headers: HeaderMap, body: Bytes| {
                let tx = tx.clone();
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    let _ = tx.send(Received { content_type, json });
                    tokio::time::sleep(delay).await;
                    status
                }
            }),
        );

        let addr = serve(app).await;
        Self {
            url: format!("http://{addr}/api/report"),
            hits,
            reports,
        }
    }

    pub async fn ok() -> Self {
        Self::start(StatusCode::OK, Duration::ZERO).await
    }

    /// Wait for the next report.
    pub async fn next(&mut self) -> Received {
        tokio::time::timeout(Duration::from_secs(5), self.reports.recv())
            .await
            .expect("no report within 5s")
            .expect("collector stopped")
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// URL on which nothing is listening.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/report")
}

/// Backend that echoes POST bodies and answers everything else with `hello`.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(|uri: Uri, body: Bytes| async move {
        if body.is_empty() {
            match uri.path() {
                "/missing" => (StatusCode::NOT_FOUND, Bytes::from_static(b"not here")),
                _ => (StatusCode::OK, Bytes::from_static(b"hello")),
            }
        } else {
            (StatusCode::OK, body)
        }
    });
    serve(app).await
}

/// Backend that waits `delay` before answering `late`.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });
    serve(app).await
}

/// Running proxy with its shutdown handle.
pub struct Proxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Proxy {
    pub async fn start(upstream: SocketAddr, tap: TapConfig) -> Self {
        let mut config = ProxyConfig::default();
        config.tap = tap;
        Self::with_config(upstream, config).await
    }

    /// Start a proxy from `config`, pointed at `upstream` on a local port.
    pub async fn with_config(upstream: SocketAddr, mut config: ProxyConfig) -> Self {
        config.listener.bind_address = "127.0.0.1:0".into();
        config.upstream.address = upstream.to_string();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let server = HttpServer::new(config).unwrap();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, rx).await;
        });

        Self { addr, shutdown }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
