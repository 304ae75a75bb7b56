//! # impbot Framework
//!
//! Handler-facing building blocks for the impbot runtime:
//!
//! - **Handlers**: the [`Handler`] trait with statically declared event types,
//!   and its object-safe form [`ErasedHandler`] used by the dispatcher
//! - **Commands**: typed `!command` parsing ([`CommandHandler`], [`Commands`],
//!   [`CommandRegistry`])
//! - **Observers**: passive listeners that see every event of their type
//!   ([`Observer`], [`ErasedObserver`])
//! - **Deferred work**: running closures on the dispatch thread
//!   ([`DeferredWork`], [`DeferredWorkHandler`])

pub mod command;
pub mod deferred;
pub mod error;
pub mod handler;
pub mod observer;

pub use command::{
    ArgKind, COMMAND_MARKER, Command, CommandArg, CommandHandler, CommandRegistry, Commands,
    Either, with_marker,
};
pub use deferred::{DeferredWork, DeferredWorkHandler};
pub use error::{CommandError, CommandResult};
pub use handler::{BoxedHandler, ErasedHandler, Handler};
pub use observer::{BoxedObserver, ErasedObserver, Observer};
