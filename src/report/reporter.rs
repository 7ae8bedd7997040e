//! Fire-and-forget delivery of captured records to the collector.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use url::Url;

use crate::capture::{CapturedRecord, Exchange};
use crate::config::{collector_url, TapConfig};
use crate::error::TapError;
use crate::observability::metrics;

/// Result of a single delivery attempt.
#[derive(Debug)]
pub enum Delivery {
    /// Collector answered with a success status.
    Delivered(StatusCode),
    /// Collector answered, but not with success.
    Rejected(StatusCode),
    /// Request never completed (connect, timeout, protocol).
    Unreachable(reqwest::Error),
    /// Record could not be serialized.
    Encode(serde_json::Error),
}

impl Delivery {
    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Delivery::Delivered(_) => "delivered",
            Delivery::Rejected(_) => "rejected",
            Delivery::Unreachable(_) => "unreachable",
            Delivery::Encode(_) => "encode_failed",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered(_))
    }
}

/// Sends captured records to a fixed collector URL.
///
/// Cloning is cheap; the HTTP client and the in-flight limiter are shared
/// by every clone.
#[derive(Clone, Debug)]
pub struct Reporter {
    client: Client,
    collector_url: Url,
    in_flight: Option<Arc<Semaphore>>,
}

impl Reporter {
    /// Build a reporter. Fails if no valid collector URL is configured.
    pub fn from_config(config: &TapConfig) -> Result<Self, TapError> {
        let collector_url = collector_url(config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.report_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            collector_url,
            in_flight: config.max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
        })
    }

    pub fn collector_url(&self) -> &Url {
        &self.collector_url
    }

    /// Hand `exchange` to a detached task and return immediately.
    ///
    /// The record is decoded and serialized on that task, never on the
    /// caller's. The task is never joined and its outcome is only logged.
    /// With `max_in_flight` set, an exchange that finds no free slot is
    /// dropped on the spot rather than queued.
    pub fn dispatch(&self, exchange: Exchange) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!(path = %exchange.path, "No async runtime available, dropping record");
            metrics::record_report("dropped");
            return;
        };

        let permit = match &self.in_flight {
            None => None,
            Some(limit) => match limit.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(
                        path = %exchange.path,
                        correlation_id = exchange.correlation_id.as_deref().unwrap_or("-"),
                        "Report limit reached, dropping record"
                    );
                    metrics::record_report("throttled");
                    return;
                }
            },
        };

        let reporter = self.clone();
        handle.spawn(async move {
            let _permit = permit;
            let record = exchange.into_record();
            let outcome = reporter.deliver(&record).await;
            log_outcome(&record, &outcome);
            metrics::record_report(outcome.label());
        });
    }

    /// Make exactly one POST attempt for `record`.
    pub async fn deliver(&self, record: &CapturedRecord) -> Delivery {
        let payload = match record.to_json() {
            Ok(payload) => payload,
            Err(e) => return Delivery::Encode(e),
        };

        tracing::trace!(url = %self.collector_url, bytes = payload.len(), "Sending record");

        let result = self
            .client
            .post(self.collector_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Delivery::Delivered(response.status()),
            Ok(response) => Delivery::Rejected(response.status()),
            Err(e) => Delivery::Unreachable(e),
        }
    }
}

fn log_outcome(record: &CapturedRecord, outcome: &Delivery) {
    let correlation_id = record.correlation_id().unwrap_or("-");
    match outcome {
        Delivery::Delivered(status) => tracing::debug!(
            correlation_id,
            path = %record.path(),
            status = %status,
            "Record delivered"
        ),
        Delivery::Rejected(status) => tracing::warn!(
            correlation_id,
            path = %record.path(),
            status = %status,
            "Collector rejected record, discarding"
        ),
        Delivery::Unreachable(e) => tracing::warn!(
            correlation_id,
            path = %record.path(),
            error = %e,
            "Failed to send record, discarding"
        ),
        Delivery::Encode(e) => tracing::warn!(
            correlation_id,
            path = %record.path(),
            error = %e,
            "Failed to serialize record, discarding"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Bytes;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::Router;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    async fn serve(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn reporter_for(addr: SocketAddr) -> Reporter {
        Reporter::from_config(&TapConfig::with_collector(format!("http://{addr}/api/report")))
            .unwrap()
    }

    fn exchange() -> Exchange {
        Exchange {
            correlation_id: Some("42-0011223344556677".into()),
            request_body: Bytes::from_static(b"ping"),
            response_body: Bytes::from_static(b"pong"),
            elapsed: Duration::from_millis(3),
            path: "/v1/echo".into(),
        }
    }

    fn record() -> CapturedRecord {
        exchange().into_record()
    }

    #[test]
    fn construction_requires_collector_url() {
        let err = Reporter::from_config(&TapConfig::default()).unwrap_err();
        assert!(matches!(err, TapError::Config(ConfigError::MissingCollectorUrl)));
    }

    #[test]
    fn dispatch_without_runtime_is_silent() {
        let reporter = Reporter::from_config(&TapConfig::with_collector(
            "http://127.0.0.1:9/api/report",
        ))
        .unwrap();
        assert_eq!(reporter.collector_url().as_str(), "http://127.0.0.1:9/api/report");
        reporter.dispatch(exchange());
    }

    #[tokio::test]
    async fn posts_json_to_collector() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/api/report",
            post(move |headers: HeaderMap, body: Bytes| {
                let tx = tx.clone();
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let _ = tx.send((content_type, body));
                }
            }),
        );
        let reporter = reporter_for(serve(app).await);

        let outcome = reporter.deliver(&record()).await;
        assert!(outcome.is_delivered(), "unexpected outcome: {outcome:?}");

        let (content_type, body) = rx.recv().await.unwrap();
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let received: CapturedRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(received.correlation_id(), Some("42-0011223344556677"));
        assert_eq!(received.request_body(), "ping");
        assert_eq!(received.response_body(), "pong");
        assert_eq!(received.path(), "/v1/echo");
    }

    #[tokio::test]
    async fn dispatch_decodes_on_the_reporting_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/api/report",
            post(move |body: Bytes| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body);
                }
            }),
        );
        let reporter = reporter_for(serve(app).await);

        let mut exchange = exchange();
        exchange.response_body = Bytes::from_static(&[0x6f, 0x6b, 0xff]);
        reporter.dispatch(exchange);

        let body = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let received: CapturedRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(received.response_body(), "ok\u{FFFD}");
        assert_eq!(received.elapsed_seconds(), 0.003);
    }

    #[tokio::test]
    async fn error_status_is_rejected_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/report",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::INTERNAL_SERVER_ERROR }
            }),
        );
        let reporter = reporter_for(serve(app).await);

        let outcome = reporter.deliver(&record()).await;

        assert!(matches!(outcome, Delivery::Rejected(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreachable_collector_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = reporter_for(addr).deliver(&record()).await;
        assert_eq!(outcome.label(), "unreachable");
    }

    #[tokio::test]
    async fn in_flight_limit_drops_instead_of_queueing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/report",
            post(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    StatusCode::OK
                }
            }),
        );
        let addr = serve(app).await;
        let mut config = TapConfig::with_collector(format!("http://{addr}/api/report"));
        config.max_in_flight = Some(1);
        let reporter = Reporter::from_config(&config).unwrap();

        reporter.dispatch(exchange());
        reporter.dispatch(exchange());
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
