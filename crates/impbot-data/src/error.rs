//! Storage error types.

use std::path::PathBuf;

use impbot_core::HandlerError;
use thiserror::Error;

/// Errors that can occur while using the store.
#[derive(Debug, Error)]
pub enum DataError {
    /// The key does not exist and no default was given.
    #[error("key '{key}' not found in {namespace}")]
    NotFound {
        /// Namespace searched.
        namespace: String,
        /// Missing key.
        key: String,
    },

    /// The subkey does not exist and no default was given.
    #[error("subkey '{key}'['{subkey}'] not found in {namespace}")]
    SubkeyNotFound {
        /// Namespace searched.
        namespace: String,
        /// Key holding the map.
        key: String,
        /// Missing subkey.
        subkey: String,
    },

    /// A scalar operation was used on a key that holds a map.
    #[error("Key '{key}' uses subkeys.")]
    UsesSubkeys {
        /// The offending key.
        key: String,
    },

    /// A map operation was used on a key that holds a scalar.
    #[error("Key '{key}' does not use subkeys.")]
    NoSubkeys {
        /// The offending key.
        key: String,
    },

    /// No store is open.
    #[error("data store used before startup")]
    NotStarted,

    /// A store is already open in this process.
    #[error("a data store is already open at {0}")]
    AlreadyOpen(PathBuf),

    /// The file was written by a different schema version.
    #[error("impbot is at schema version {expected}, database is at {found}")]
    SchemaVersion {
        /// Version this build writes.
        expected: i64,
        /// Version recorded in the file.
        found: i64,
    },

    /// The file predates namespaced storage.
    #[error("database uses the old single-table format and must be migrated")]
    OldFormat,

    /// SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl DataError {
    /// Whether this is a missing key or subkey.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SubkeyNotFound { .. })
    }
}

/// SQLite failures are operational; everything else is misuse of the store.
impl From<DataError> for HandlerError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Sqlite(e) => HandlerError::server(e.to_string()),
            DataError::Io(e) => HandlerError::server(e),
            other => HandlerError::invariant(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type DataResult<T> = Result<T, DataError>;
