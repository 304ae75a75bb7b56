//! Process-wide store lifecycle and per-thread SQLite connections.
//!
//! Exactly one [`Store`] may be open at a time. Every thread that touches a
//! [`Namespace`](crate::Namespace) lazily opens its own SQLite connection to
//! the open store; connections are never shared between threads.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{DataError, DataResult};
use crate::schema;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct ActiveStore {
    generation: u64,
    path: PathBuf,
}

static ACTIVE: RwLock<Option<ActiveStore>> = RwLock::new(None);
static GENERATION: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CONNECTION: RefCell<Option<(u64, Connection)>> = const { RefCell::new(None) };
}

/// Guard for the open store. Dropping it closes the store.
#[derive(Debug)]
pub struct Store {
    generation: u64,
    path: PathBuf,
}

impl Store {
    /// Opens the store at `path`, creating the file and tables if needed.
    ///
    /// Fails if another store is open, if the file uses the old format, or if
    /// its schema version differs from [`SCHEMA_VERSION`](crate::SCHEMA_VERSION).
    pub fn open(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut active = ACTIVE.write();
        if let Some(current) = active.as_ref() {
            return Err(DataError::AlreadyOpen(current.path.clone()));
        }

        if !path.exists() {
            warn!(path = %path.display(), "Database file doesn't exist; creating a new one");
        }
        let mut conn = open_connection(&path)?;
        schema::initialize(&mut conn)?;

        let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
        *active = Some(ActiveStore {
            generation,
            path: path.clone(),
        });
        CONNECTION.with_borrow_mut(|slot| *slot = Some((generation, conn)));

        info!(path = %path.display(), "Data store opened");
        Ok(Self { generation, path })
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the store. Equivalent to dropping the guard.
    pub fn close(self) {}
}

impl Drop for Store {
    fn drop(&mut self) {
        let mut active = ACTIVE.write();
        if active
            .as_ref()
            .is_some_and(|a| a.generation == self.generation)
        {
            *active = None;
        }
        drop(active);

        // Only this thread's handle can be closed here; other threads notice
        // the generation change on their next access.
        let _ = CONNECTION.try_with(|slot| {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                *slot = None;
            }
        });
        info!(path = %self.path.display(), "Data store closed");
    }
}

/// Whether a store is currently open.
pub fn is_open() -> bool {
    ACTIVE.read().is_some()
}

fn open_connection(path: &Path) -> DataResult<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    debug!(path = %path.display(), "Opened store connection for this thread");
    Ok(conn)
}

/// Runs `f` with this thread's connection to the open store.
pub(crate) fn with_connection<T>(
    f: impl FnOnce(&mut Connection) -> DataResult<T>,
) -> DataResult<T> {
    let (generation, path) = {
        let active = ACTIVE.read();
        let store = active.as_ref().ok_or(DataError::NotStarted)?;
        (store.generation, store.path.clone())
    };

    CONNECTION.with_borrow_mut(|slot| {
        let current = matches!(slot.as_ref(), Some((g, _)) if *g == generation);
        if !current {
            *slot = Some((generation, open_connection(&path)?));
        }
        match slot.as_mut() {
            Some((_, conn)) => f(conn),
            None => Err(DataError::NotStarted),
        }
    })
}
