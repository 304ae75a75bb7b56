//! # impbot Connections
//!
//! Transports that feed the impbot event queue:
//!
//! - [`LineConnection`]: messages from any line reader, replies to any writer
//! - [`StdioConnection`]: the console flavour of it
//! - [`Backoff`] / [`RetryConfig`]: reconnect pacing

pub mod line;
pub mod retry;

pub use line::{LineConnection, StdioConnection};
pub use retry::{Backoff, RetryConfig};
