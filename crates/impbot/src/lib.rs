//! # impbot
//!
//! A chat bot runtime. Connections run on their own threads and feed one
//! FIFO queue; a single dispatch thread hands each event to the first
//! handler that claims it, so handlers never need locks.
//!
//! ```text
//! ┌────────────┐     ┌───────┐     ┌───────────────┐     ┌─────────────────────┐
//! │ Connection │────▶│       │     │               │────▶│ DeferredWorkHandler │
//! │ Connection │────▶│ queue │────▶│ event-handler │────▶│ Handler             │──▶ Namespace
//! │ ...        │────▶│       │     │    thread     │────▶│ Handler ...         │──▶ (SQLite)
//! └────────────┘     └───────┘     └───────────────┘     └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use impbot::prelude::*;
//!
//! fn main() -> anyhow::Result<std::process::ExitCode> {
//!     let bot = Bot::builder()
//!         .database("impbot.db")
//!         .connection(StdioConnection::stdio(User::new("console", "me")))
//!         .handler(Hello::handler()?)
//!         .build()?;
//!     Ok(bot.main()?.exit_code())
//! }
//! ```
//!
//! ## Features
//!
//! - `handlers` *(default)*: the stock handlers in [`handlers`]
//! - `toml-config` *(default)* / `yaml-config`: config file formats
//! - `json-log`: JSON log lines
//! - `testing`: the [`data::testing::TempStore`] fixture

pub use impbot_connections as connections;
pub use impbot_core as core;
pub use impbot_data as data;
pub use impbot_framework as framework;
#[cfg(feature = "handlers")]
pub use impbot_handlers as handlers;
pub use impbot_runtime as runtime;

/// Commonly used types for building a bot.
///
/// ```rust,ignore
/// use impbot::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use impbot_runtime::{
        Bot, BotBuilder, BotHandle, ConfigLoader, Delegator, ImpbotConfig, ShutdownReport,
    };

    // Events and connections
    pub use impbot_core::{
        Connection, ConnectionError, ConnectionResult, Event, EventSender, Message, Shutdown,
        User,
    };
    pub use impbot_connections::{LineConnection, RetryConfig, StdioConnection};

    // Handlers and commands
    pub use impbot_core::{HandlerError, HandlerResult};
    pub use impbot_framework::{
        CommandHandler, CommandRegistry, CommandResult, Commands, Either, Handler, Observer,
    };

    // Storage
    pub use impbot_data::{Namespace, Value};

    #[cfg(feature = "handlers")]
    pub use impbot_handlers::{CustomCommands, CustomRegex, Hello, LoggingObserver, Roulette};
}
