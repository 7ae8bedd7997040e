//! Transparent traffic tap for a reverse proxy.
//!
//! Every request passing through [`TapLayer`] has its request body, response
//! body, path and timing captured into a [`CapturedRecord`], which is POSTed
//! as JSON to a collector on a detached task. The client and the wrapped
//! service observe nothing different, except that an unreadable request body
//! is answered with `500`.

pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod report;
pub mod tap;

pub use capture::{generate_correlation_id, CapturedRecord, CapturingBody, Exchange};
pub use config::schema::{ProxyConfig, TapConfig};
pub use error::{ConfigError, TapError};
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use report::{Delivery, Reporter};
pub use tap::{CorrelationId, TapLayer, TapService};
