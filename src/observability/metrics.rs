//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tap_reports_total` (counter): report attempts by outcome
//! - `tap_exchange_duration_seconds` (histogram): request entry to end of response body

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one report outcome.
pub fn record_report(outcome: &'static str) {
    counter!("tap_reports_total", "outcome" => outcome).increment(1);
}

/// Record the duration of one captured exchange.
pub fn record_exchange(elapsed: Duration) {
    histogram!("tap_exchange_duration_seconds").record(elapsed.as_secs_f64());
}
