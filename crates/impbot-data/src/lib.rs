//! # impbot Data
//!
//! Namespaced persistent storage for handlers, backed by SQLite.
//!
//! ```rust,ignore
//! use impbot_data::{Namespace, Store};
//!
//! let _store = Store::open("impbot.sqlite")?;
//!
//! let data = Namespace::of::<MyHandler>();
//! data.set("greeting", "hello")?;
//! data.set_subkey("counts", "alice", "3")?;
//! assert_eq!(data.get("greeting")?, "hello");
//! ```
//!
//! The store is opened once per process; each thread lazily gets its own
//! SQLite connection, and every write runs in its own transaction.

pub mod error;
pub mod namespace;
pub mod schema;
pub mod store;

#[cfg(feature = "testing")]
pub mod testing;

pub use error::{DataError, DataResult};
pub use namespace::{Namespace, Value};
pub use schema::SCHEMA_VERSION;
pub use store::{Store, is_open};
