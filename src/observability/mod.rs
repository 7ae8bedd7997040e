//! Observability subsystem.
//!
//! Logging goes through `tracing` everywhere and is initialized in `main`.
//! This module holds the metrics side: counters for report outcomes and a
//! histogram of exchange durations, exported for Prometheus scrapes.
//!
//! Metric updates without an installed recorder are no-ops, so the library
//! can be embedded without the exporter.

pub mod metrics;
