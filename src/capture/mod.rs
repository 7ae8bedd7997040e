//! Capture primitives.
//!
//! # Data Flow
//! ```text
//! response body frames
//!     → body.rs (mirror data frames into a buffer, pass frames through)
//!     → on end of stream: record.rs (raw Exchange)
//!     → reporting task: Exchange::into_record (decode into CapturedRecord)
//!
//! id.rs mints the per-request correlation ID carried in the record.
//! ```

pub mod body;
pub mod id;
pub mod record;

pub use body::CapturingBody;
pub use id::generate_correlation_id;
pub use record::{CapturedRecord, Exchange};
