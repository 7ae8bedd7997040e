//! Lifecycle management.
//!
//! Shutdown is a latched `watch` flag. Reports still in flight when the
//! server stops are not awaited.

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
