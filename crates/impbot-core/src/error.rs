//! Error types shared by connections, handlers and the dispatcher.

use thiserror::Error;

// =============================================================================
// Handler Errors
// =============================================================================

/// How the dispatcher treats a [`HandlerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The user did something wrong. The text is sent back to them.
    User,
    /// Something outside the user's control failed. Logged, and the user gets
    /// a generic failure reply.
    Operational,
    /// A programming error. Never swallowed.
    Fatal,
}

/// Errors returned from handler hooks.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// A user-facing error; the text is replied verbatim.
    ///
    /// An empty message inside a command is rewritten into [`Self::Usage`].
    #[error("{0}")]
    User(String),

    /// A command was invoked with bad arguments. Holds the usage string.
    #[error("Usage: {0}")]
    Usage(String),

    /// The bot is misconfigured.
    #[error("admin error: {0}")]
    Admin(String),

    /// A remote service misbehaved.
    #[error("server error: {0}")]
    Server(String),

    /// A broken invariant, such as reading a scalar key as a map.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl HandlerError {
    /// Creates a user-facing error.
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    /// Creates a usage error from a usage string.
    pub fn usage(usage: impl Into<String>) -> Self {
        Self::Usage(usage.into())
    }

    /// Creates an admin (configuration) error.
    pub fn admin(msg: impl Into<String>) -> Self {
        Self::Admin(msg.into())
    }

    /// Creates a server error.
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Creates an invariant error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Returns how the dispatcher should treat this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::User(_) | Self::Usage(_) => ErrorClass::User,
            Self::Admin(_) | Self::Server(_) => ErrorClass::Operational,
            Self::Invariant(_) => ErrorClass::Fatal,
        }
    }
}

/// Result of running a handler: an optional reply.
pub type HandlerResult = Result<Option<String>, HandlerError>;

// =============================================================================
// Connection Errors
// =============================================================================

/// Errors raised by connections.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// `say` was called on a connection that cannot chat.
    #[error("connection '{connection}' can't take a chat response")]
    NotChat {
        /// The connection that was asked to speak.
        connection: String,
    },

    /// The transport failed and could not be recovered.
    #[error("transport failed: {0}")]
    Transport(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// The dispatcher queue is gone; nothing more can be emitted.
    #[error("event queue closed")]
    QueueClosed,
}

impl ConnectionError {
    /// Creates a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether this error is a programming error rather than a transport hiccup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotChat { .. })
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;
