//! Traffic interception.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → layer.rs (buffer body, re-expose it, mint correlation ID)
//!     → inner service
//!     → response body wrapped in CapturingBody, streamed to client
//!     → end of body: Exchange → Reporter::dispatch (detached)
//!
//! dropped before a response: Exchange with empty response body
//! ```

pub mod layer;

pub use layer::{CorrelationId, TapLayer, TapService};
