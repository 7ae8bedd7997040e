//! Telemetry reporting.
//!
//! # Data Flow
//! ```text
//! Exchange (raw bytes)
//!     → Reporter::dispatch (optional in-flight permit, detached tokio task)
//!     → Exchange::into_record on that task
//!     → Reporter::deliver (serialize, single POST to the collector)
//!     → Delivery outcome logged and counted, record dropped
//! ```
//!
//! # Design Decisions
//! - One attempt per record: no retries, no queue, no backoff
//! - Failures never reach the request that produced the record
//! - Spawned tasks are not joined; reports in flight at process exit are lost

pub mod reporter;

pub use reporter::{Delivery, Reporter};
