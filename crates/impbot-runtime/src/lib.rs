//! # impbot Runtime
//!
//! Runs a bot: one thread per connection feeding a FIFO queue, and one
//! dispatch thread that hands each event to the first handler that claims it.
//!
//! - [`Bot`] / [`BotBuilder`]: construction, `main` and shutdown
//! - [`Dispatcher`]: handler ordering, error classes and replies
//! - [`Delegator`]: running closures on the dispatch thread
//! - [`config`]: figment-based configuration
//! - [`logging`]: `tracing-subscriber` setup

pub mod bot;
pub mod config;
pub mod delegate;
pub mod dispatcher;
pub mod error;
pub mod logging;

pub use bot::{Bot, BotBuilder, BotHandle, BotState, DISPATCH_THREAD, ShutdownReport};
pub use config::{ConfigLoader, ImpbotConfig, load_config, load_config_from_file};
pub use delegate::{DelegateError, Delegator};
pub use dispatcher::{Dispatcher, GENERIC_FAILURE_REPLY};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents, init_from_config};
