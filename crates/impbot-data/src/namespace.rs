//! Per-handler key-value storage.
//!
//! Each handler owns one [`Namespace`], named after its type. A key holds
//! either a scalar ("KV") or a map of subkeys to scalars ("KKV"); the kind is
//! fixed when the key is first written, and using it as the other kind is an
//! error.

use std::collections::{BTreeMap, HashMap};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::error::{DataError, DataResult};
use crate::store::with_connection;

/// A value accepted by [`Namespace::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A single string.
    Scalar(String),
    /// A subkey to string map. Replaces every existing subkey.
    Dict(BTreeMap<String, String>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<BTreeMap<String, String>> for Value {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Dict(value)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(value: HashMap<String, String>) -> Self {
        Self::Dict(value.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Scalar,
    Dict,
}

impl KeyKind {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Scalar => "KV",
            Self::Dict => "KKV",
        }
    }
}

/// A handle to one namespace of the open store.
///
/// Handles are cheap and hold no connection; every call runs on the calling
/// thread's own connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    name: String,
}

impl Namespace {
    /// The namespace owned by type `T`, keyed by its fully-qualified name.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn not_found(&self, key: &str) -> DataError {
        DataError::NotFound {
            namespace: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn subkey_not_found(&self, key: &str, subkey: &str) -> DataError {
        DataError::SubkeyNotFound {
            namespace: self.name.clone(),
            key: key.to_string(),
            subkey: subkey.to_string(),
        }
    }

    /// Looks up a key's id, checking its kind. Creates it when asked to.
    fn find_key(
        &self,
        conn: &Connection,
        key: &str,
        kind: KeyKind,
        create: bool,
    ) -> DataResult<Option<i64>> {
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT key_id, type FROM keys WHERE namespace = ?1 AND key = ?2",
                params![self.name, key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((key_id, stored)) if stored == kind.as_sql() => Ok(Some(key_id)),
            Some(_) => Err(match kind {
                KeyKind::Scalar => DataError::UsesSubkeys {
                    key: key.to_string(),
                },
                KeyKind::Dict => DataError::NoSubkeys {
                    key: key.to_string(),
                },
            }),
            None if create => {
                conn.execute(
                    "INSERT INTO keys (namespace, key, type) VALUES (?1, ?2, ?3)",
                    params![self.name, key, kind.as_sql()],
                )?;
                Ok(Some(conn.last_insert_rowid()))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads a scalar key.
    pub fn get(&self, key: &str) -> DataResult<String> {
        with_connection(|conn| {
            let key_id = self
                .find_key(conn, key, KeyKind::Scalar, false)?
                .ok_or_else(|| self.not_found(key))?;
            let value: Option<Option<String>> = conn
                .query_row(
                    "SELECT value FROM key_values WHERE key_id = ?1",
                    [key_id],
                    |row| row.get(0),
                )
                .optional()?;
            value.flatten().ok_or_else(|| self.not_found(key))
        })
    }

    /// Reads a scalar key, falling back to `default` when it is missing.
    pub fn get_or(&self, key: &str, default: &str) -> DataResult<String> {
        match self.get(key) {
            Err(e) if e.is_not_found() => Ok(default.to_string()),
            other => other,
        }
    }

    /// Reads one subkey of a map key.
    pub fn get_subkey(&self, key: &str, subkey: &str) -> DataResult<String> {
        with_connection(|conn| {
            let key_id = self
                .find_key(conn, key, KeyKind::Dict, false)?
                .ok_or_else(|| self.not_found(key))?;
            let value: Option<Option<String>> = conn
                .query_row(
                    "SELECT value FROM key_subkey_values WHERE key_id = ?1 AND subkey = ?2",
                    params![key_id, subkey],
                    |row| row.get(0),
                )
                .optional()?;
            value
                .flatten()
                .ok_or_else(|| self.subkey_not_found(key, subkey))
        })
    }

    /// Reads one subkey, falling back to `default` when the key or subkey is
    /// missing.
    pub fn get_subkey_or(&self, key: &str, subkey: &str, default: &str) -> DataResult<String> {
        match self.get_subkey(key, subkey) {
            Err(e) if e.is_not_found() => Ok(default.to_string()),
            other => other,
        }
    }

    /// Reads a whole map key.
    pub fn get_dict(&self, key: &str) -> DataResult<BTreeMap<String, String>> {
        with_connection(|conn| {
            let key_id = self
                .find_key(conn, key, KeyKind::Dict, false)?
                .ok_or_else(|| self.not_found(key))?;
            let mut stmt =
                conn.prepare("SELECT subkey, value FROM key_subkey_values WHERE key_id = ?1")?;
            let rows = stmt.query_map([key_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            let mut dict = BTreeMap::new();
            for row in rows {
                let (subkey, value) = row?;
                dict.insert(subkey, value.unwrap_or_default());
            }
            Ok(dict)
        })
    }

    /// Whether a key of either kind exists.
    pub fn exists(&self, key: &str) -> DataResult<bool> {
        with_connection(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM keys WHERE namespace = ?1 AND key = ?2",
                    params![self.name, key],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Whether a subkey of a map key exists.
    pub fn exists_subkey(&self, key: &str, subkey: &str) -> DataResult<bool> {
        match self.get_subkey(key, subkey) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Every scalar key with its value.
    pub fn get_all_values(&self) -> DataResult<BTreeMap<String, String>> {
        with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value FROM keys JOIN key_values USING (key_id)
                 WHERE namespace = ?1",
            )?;
            let rows = stmt.query_map([&self.name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            let mut values = BTreeMap::new();
            for row in rows {
                let (key, value) = row?;
                values.insert(key, value.unwrap_or_default());
            }
            Ok(values)
        })
    }

    /// Every map key with its subkeys. Empty maps are included.
    pub fn get_all_dicts(&self) -> DataResult<BTreeMap<String, BTreeMap<String, String>>> {
        with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, subkey, value FROM keys LEFT JOIN key_subkey_values USING (key_id)
                 WHERE namespace = ?1 AND type = 'KKV'",
            )?;
            let rows = stmt.query_map([&self.name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?;
            let mut dicts: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
            for row in rows {
                let (key, subkey, value) = row?;
                let dict = dicts.entry(key).or_default();
                if let Some(subkey) = subkey {
                    dict.insert(subkey, value.unwrap_or_default());
                }
            }
            Ok(dicts)
        })
    }

    /// Scalar keys ending in `suffix`, with their values, sorted by key.
    pub fn list(&self, suffix: &str) -> DataResult<Vec<(String, String)>> {
        Ok(self
            .get_all_values()?
            .into_iter()
            .filter(|(key, _)| key.ends_with(suffix))
            .collect())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Writes a scalar, or replaces a whole map.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> DataResult<()> {
        let value = value.into();
        with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            match &value {
                Value::Scalar(v) => {
                    let key_id = self
                        .find_key(&tx, key, KeyKind::Scalar, true)?
                        .ok_or_else(|| self.not_found(key))?;
                    tx.execute(
                        "INSERT OR REPLACE INTO key_values (key_id, value) VALUES (?1, ?2)",
                        params![key_id, v],
                    )?;
                }
                Value::Dict(dict) => {
                    let key_id = self
                        .find_key(&tx, key, KeyKind::Dict, true)?
                        .ok_or_else(|| self.not_found(key))?;
                    tx.execute(
                        "DELETE FROM key_subkey_values WHERE key_id = ?1",
                        [key_id],
                    )?;
                    let mut insert = tx.prepare(
                        "INSERT INTO key_subkey_values (key_id, subkey, value) VALUES (?1, ?2, ?3)",
                    )?;
                    for (subkey, v) in dict {
                        insert.execute(params![key_id, subkey, v])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Writes one subkey of a map key, creating the key if needed.
    pub fn set_subkey(&self, key: &str, subkey: &str, value: &str) -> DataResult<()> {
        with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let key_id = self
                .find_key(&tx, key, KeyKind::Dict, true)?
                .ok_or_else(|| self.not_found(key))?;
            tx.execute(
                "INSERT OR REPLACE INTO key_subkey_values (key_id, subkey, value)
                 VALUES (?1, ?2, ?3)",
                params![key_id, subkey, value],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Adds `delta` to each subkey, treating missing subkeys as 0.
    pub fn increment_subkeys(&self, key: &str, subkeys: &[&str], delta: i64) -> DataResult<()> {
        with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let key_id = self
                .find_key(&tx, key, KeyKind::Dict, true)?
                .ok_or_else(|| self.not_found(key))?;
            for subkey in subkeys {
                tx.execute(
                    "INSERT OR IGNORE INTO key_subkey_values (key_id, subkey, value)
                     VALUES (?1, ?2, 0)",
                    params![key_id, subkey],
                )?;
                tx.execute(
                    "UPDATE key_subkey_values SET value = value + ?3
                     WHERE key_id = ?1 AND subkey = ?2",
                    params![key_id, subkey, delta],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    /// Deletes a key of either kind. Missing keys are ignored.
    pub fn unset(&self, key: &str) -> DataResult<()> {
        with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "DELETE FROM keys WHERE namespace = ?1 AND key = ?2",
                params![self.name, key],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Deletes one subkey of a map key. Missing keys and subkeys are ignored.
    pub fn unset_subkey(&self, key: &str, subkey: &str) -> DataResult<()> {
        with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if let Some(key_id) = self.find_key(&tx, key, KeyKind::Dict, false)? {
                tx.execute(
                    "DELETE FROM key_subkey_values WHERE key_id = ?1 AND subkey = ?2",
                    params![key_id, subkey],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Deletes every key in the namespace except those listed.
    pub fn clear_all(&self, except: &[&str]) -> DataResult<()> {
        with_connection(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let keys: Vec<String> = {
                let mut stmt = tx.prepare("SELECT key FROM keys WHERE namespace = ?1")?;
                let rows = stmt.query_map([&self.name], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<_, _>>()?
            };
            for key in keys.iter().filter(|k| !except.contains(&k.as_str())) {
                tx.execute(
                    "DELETE FROM keys WHERE namespace = ?1 AND key = ?2",
                    params![self.name, key],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use serial_test::serial;

    struct Foo;
    struct Bar;

    fn with_store(test: impl FnOnce()) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.sqlite")).unwrap();
        test();
        store.close();
    }

    #[test]
    #[serial]
    fn test_scalar_round_trip_and_isolation() {
        with_store(|| {
            let foo = Namespace::of::<Foo>();
            assert!(!foo.exists("testing").unwrap());
            assert!(foo.get("testing").unwrap_err().is_not_found());
            assert!(foo.list("ing").unwrap().is_empty());

            foo.set("testing", "value").unwrap();
            assert!(foo.exists("testing").unwrap());
            assert_eq!(foo.get("testing").unwrap(), "value");
            assert_eq!(
                foo.list("ing").unwrap(),
                vec![("testing".to_string(), "value".to_string())]
            );

            foo.set("twosting", "another value").unwrap();
            assert_eq!(foo.list("ing").unwrap().len(), 2);

            // A second handle to the same namespace sees the same data.
            let foo2 = Namespace::of::<Foo>();
            assert_eq!(foo2.get("testing").unwrap(), "value");

            let bar = Namespace::of::<Bar>();
            assert!(!bar.exists("testing").unwrap());
            assert!(bar.get("testing").unwrap_err().is_not_found());

            foo.unset("testing").unwrap();
            assert!(!foo2.exists("testing").unwrap());
        });
    }

    #[test]
    #[serial]
    fn test_defaults() {
        with_store(|| {
            let ns = Namespace::of::<Foo>();
            assert_eq!(ns.get_or("points", "0").unwrap(), "0");
            assert_eq!(ns.get_subkey_or("count", "x", "5").unwrap(), "5");
        });
    }

    #[test]
    #[serial]
    fn test_dict_round_trip() {
        with_store(|| {
            let ns = Namespace::of::<Foo>();
            let dict: BTreeMap<String, String> = [("a", "1"), ("b", "2")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            ns.set("d", dict.clone()).unwrap();
            assert_eq!(ns.get_dict("d").unwrap(), dict);
            assert_eq!(ns.get_subkey("d", "a").unwrap(), "1");
            assert!(ns.exists_subkey("d", "b").unwrap());
            assert!(!ns.exists_subkey("d", "c").unwrap());

            // Setting a dict replaces every subkey.
            let replacement: BTreeMap<String, String> =
                [("c".to_string(), "3".to_string())].into_iter().collect();
            ns.set("d", replacement.clone()).unwrap();
            assert_eq!(ns.get_dict("d").unwrap(), replacement);

            ns.set_subkey("d", "e", "4").unwrap();
            assert_eq!(ns.get_dict("d").unwrap().len(), 2);
        });
    }

    #[test]
    #[serial]
    fn test_kind_mismatch() {
        with_store(|| {
            let ns = Namespace::of::<Foo>();
            ns.set("scalar", "x").unwrap();
            ns.set_subkey("map", "k", "v").unwrap();

            let err = ns.get_subkey("scalar", "k").unwrap_err();
            assert!(matches!(err, DataError::NoSubkeys { .. }));
            assert_eq!(err.to_string(), "Key 'scalar' does not use subkeys.");

            let err = ns.get("map").unwrap_err();
            assert!(matches!(err, DataError::UsesSubkeys { .. }));
            assert_eq!(err.to_string(), "Key 'map' uses subkeys.");

            assert!(ns.set("map", "y").is_err());
            assert!(ns.set_subkey("scalar", "k", "v").is_err());
            assert!(ns.exists_subkey("scalar", "k").is_err());
        });
    }

    #[test]
    #[serial]
    fn test_unset_is_idempotent() {
        with_store(|| {
            let ns = Namespace::of::<Foo>();
            ns.set("k", "v").unwrap();
            ns.unset("k").unwrap();
            ns.unset("k").unwrap();
            assert!(!ns.exists("k").unwrap());

            ns.set_subkey("m", "a", "1").unwrap();
            ns.unset_subkey("m", "a").unwrap();
            ns.unset_subkey("m", "a").unwrap();
            ns.unset_subkey("missing", "a").unwrap();
            assert!(ns.exists("m").unwrap());
            assert!(ns.get_dict("m").unwrap().is_empty());

            // Deleting a map key removes its subkeys too.
            ns.set_subkey("m", "a", "1").unwrap();
            ns.unset("m").unwrap();
            assert!(!ns.exists("m").unwrap());
        });
    }

    #[test]
    #[serial]
    fn test_increment_subkeys() {
        with_store(|| {
            let ns = Namespace::of::<Foo>();
            ns.set_subkey("votes", "a", "3").unwrap();
            ns.increment_subkeys("votes", &["a", "b"], 2).unwrap();
            assert_eq!(ns.get_subkey("votes", "a").unwrap(), "5");
            assert_eq!(ns.get_subkey("votes", "b").unwrap(), "2");
        });
    }

    #[test]
    #[serial]
    fn test_get_all_and_clear() {
        with_store(|| {
            let ns = Namespace::of::<Foo>();
            ns.set("a", "1").unwrap();
            ns.set("b", "2").unwrap();
            ns.set_subkey("m", "x", "y").unwrap();
            ns.set("empty", BTreeMap::<String, String>::new()).unwrap();

            let values = ns.get_all_values().unwrap();
            assert_eq!(values.len(), 2);
            assert_eq!(values["b"], "2");

            let dicts = ns.get_all_dicts().unwrap();
            assert_eq!(dicts.len(), 2);
            assert_eq!(dicts["m"]["x"], "y");
            assert!(dicts["empty"].is_empty());

            ns.clear_all(&["b"]).unwrap();
            assert_eq!(ns.get_all_values().unwrap().len(), 1);
            assert!(ns.get_all_dicts().unwrap().is_empty());
            assert_eq!(ns.get("b").unwrap(), "2");
        });
    }

    #[test]
    #[serial]
    fn test_not_started() {
        let ns = Namespace::of::<Foo>();
        assert!(matches!(ns.get("k"), Err(DataError::NotStarted)));
    }
}
