//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → TraceLayer → TapLayer → TimeoutLayer
//!     → forward handler (hyper client to upstream)
//!     → upstream response streamed back through the tap
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
