//! Test fixture: a store in a temporary directory.
//!
//! Tests using it share the process-wide store and must run serially.

use std::path::Path;

use tempfile::TempDir;

use crate::error::DataResult;
use crate::store::Store;

/// An open store backed by a throwaway file.
///
/// The store is closed and the file deleted when the fixture is dropped.
pub struct TempStore {
    store: Option<Store>,
    dir: TempDir,
}

impl TempStore {
    /// Opens a fresh store.
    pub fn new() -> DataResult<Self> {
        let dir = tempfile::tempdir()?;
        let store = Store::open(dir.path().join("impbot.sqlite"))?;
        Ok(Self {
            store: Some(store),
            dir,
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        self.store
            .as_ref()
            .map(Store::path)
            .unwrap_or_else(|| self.dir.path())
    }

    /// Closes the store but keeps the file, so it can be reopened.
    pub fn close(&mut self) {
        self.store.take();
    }
}

impl Drop for TempStore {
    fn drop(&mut self) {
        // The store must close before the directory is removed.
        self.store.take();
    }
}
