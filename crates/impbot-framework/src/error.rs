//! Error types for the impbot framework.

use thiserror::Error;

/// Errors in how a handler declares its commands.
///
/// These are composition-time programming errors; the bot refuses to start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The same command was registered twice by one handler.
    #[error("{handler} registers '{command}' twice")]
    Duplicate {
        /// Handler type name.
        handler: &'static str,
        /// The command, marker included.
        command: String,
    },

    /// The parameter names don't match the function's arguments.
    #[error("'{command}' names {named} parameters but its function takes {expected}")]
    ParamCount {
        /// The command, marker included.
        command: String,
        /// Number of names given.
        named: usize,
        /// Number of parsed arguments the function takes.
        expected: usize,
    },

    /// The command name is empty or contains whitespace.
    #[error("invalid command name '{0}'")]
    InvalidName(String),
}

/// Result type for command registration.
pub type CommandResult<T> = Result<T, CommandError>;
