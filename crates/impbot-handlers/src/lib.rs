//! # impbot Handlers
//!
//! Ready-made chat behaviours:
//!
//! - [`Hello`]: `!hello`
//! - [`Roulette`]: gambling stored points
//! - [`CustomCommands`]: moderator-defined commands with counters and aliases
//! - [`RegexHandler`] / [`CustomRegex`]: pattern-triggered replies
//! - [`LoggingObserver`]: a chat transcript in the log

pub mod custom;
pub mod hello;
pub mod pattern;
pub mod roulette;
pub mod transcript;

pub use custom::{CustomCommandHandler, CustomCommands};
pub use hello::{Hello, HelloHandler};
pub use pattern::{CustomRegex, RegexHandler};
pub use roulette::{Coin, Roulette, RouletteHandler};
pub use transcript::LoggingObserver;
