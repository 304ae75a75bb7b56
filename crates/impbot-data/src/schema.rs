//! On-disk layout and schema versioning.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::error::{DataError, DataResult};

/// Version of the layout written by this build.
pub const SCHEMA_VERSION: i64 = 2;

/// Namespace of the reserved row holding the schema version.
pub const RESERVED_NAMESPACE: &str = "impbot::Bot";

/// Key of the reserved row holding the schema version.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

const CREATE_TABLES: &str = "
    CREATE TABLE keys (
        key_id INTEGER PRIMARY KEY,
        namespace TEXT NOT NULL,
        key TEXT NOT NULL,
        type TEXT NOT NULL CHECK (type IN ('KV', 'KKV'))
    );
    CREATE UNIQUE INDEX idx_keys_nk ON keys (namespace, key);

    CREATE TABLE key_values (
        key_id INTEGER NOT NULL REFERENCES keys ON DELETE CASCADE,
        value TEXT
    );
    CREATE UNIQUE INDEX idx_kv_keyid ON key_values (key_id);

    CREATE TABLE key_subkey_values (
        key_id INTEGER NOT NULL REFERENCES keys ON DELETE CASCADE,
        subkey TEXT NOT NULL,
        value TEXT
    );
    CREATE UNIQUE INDEX idx_kkv_keyid_subkey ON key_subkey_values (key_id, subkey);
";

fn table_exists(conn: &Connection, name: &str) -> DataResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Creates the tables if the file is empty, then checks the recorded version.
pub(crate) fn initialize(conn: &mut Connection) -> DataResult<()> {
    if table_exists(conn, "impbot")? {
        return Err(DataError::OldFormat);
    }

    if !table_exists(conn, "keys")? {
        info!(version = SCHEMA_VERSION, "Creating store tables");
        let tx = conn.transaction()?;
        tx.execute_batch(CREATE_TABLES)?;
        tx.execute(
            "INSERT INTO keys (namespace, key, type) VALUES (?1, ?2, 'KV')",
            params![RESERVED_NAMESPACE, SCHEMA_VERSION_KEY],
        )?;
        let key_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO key_values (key_id, value) VALUES (?1, ?2)",
            params![key_id, SCHEMA_VERSION.to_string()],
        )?;
        tx.commit()?;
    }

    let found = stored_version(conn)?;
    if found != SCHEMA_VERSION {
        return Err(DataError::SchemaVersion {
            expected: SCHEMA_VERSION,
            found,
        });
    }
    Ok(())
}

/// Reads the version marker. A missing or unparsable marker reads as 0.
pub(crate) fn stored_version(conn: &Connection) -> DataResult<i64> {
    let value: Option<Option<String>> = conn
        .query_row(
            "SELECT value FROM keys JOIN key_values USING (key_id)
             WHERE namespace = ?1 AND key = ?2",
            params![RESERVED_NAMESPACE, SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value
        .flatten()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}
