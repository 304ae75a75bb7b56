//! Runtime error types.

use impbot_core::{ConnectionError, HandlerError};
use impbot_data::DataError;
use impbot_framework::CommandError;
use thiserror::Error;

pub use crate::config::error::{ConfigError, ConfigResult};

/// Errors that stop the bot.
///
/// Everything here is fatal: construction errors keep the bot from starting,
/// and dispatch errors end the dispatch loop.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Two handlers claim the same command.
    #[error("Both {first} and {second} register '{command}'")]
    DuplicateCommand {
        /// The command, marker included.
        command: String,
        /// Handler registered first.
        first: &'static str,
        /// Handler registered second.
        second: &'static str,
    },

    /// A handler's command table is malformed.
    #[error("Command table error: {0}")]
    Command(#[from] CommandError),

    /// The store could not be opened.
    #[error("Data store error: {0}")]
    Data(#[from] DataError),

    /// A startup hook failed.
    #[error("{handler} failed to start: {source}")]
    Startup {
        /// Handler type name.
        handler: &'static str,
        /// The hook's error.
        source: HandlerError,
    },

    /// A handler reported a programming error.
    #[error("{handler} broke an invariant: {source}")]
    HandlerInvariant {
        /// Handler type name.
        handler: &'static str,
        /// The handler's error.
        source: HandlerError,
    },

    /// A reply was produced for an event that has nowhere to send it.
    #[error("'{event}' event can't take a chat response")]
    NoReplyTarget {
        /// Event name.
        event: &'static str,
    },

    /// A reply went to a connection that cannot chat.
    #[error("Reply failed: {0}")]
    Reply(#[source] ConnectionError),

    /// The dispatch thread panicked.
    #[error("Dispatch thread panicked")]
    DispatchPanicked,

    /// A worker thread could not be started.
    #[error("Failed to spawn thread '{name}': {reason}")]
    Spawn {
        /// Thread name.
        name: String,
        /// OS error.
        reason: String,
    },
}

impl RuntimeError {
    pub(crate) fn spawn(name: impl Into<String>, err: std::io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            reason: err.to_string(),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
