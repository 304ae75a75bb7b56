//! # impbot Core
//!
//! The vocabulary shared by every part of the impbot runtime:
//!
//! - **Users**: value-typed chat identities ([`User`])
//! - **Events**: type-erased events with static type tags ([`Event`],
//!   [`BoxedEvent`], [`EventTag`], [`Message`], [`Shutdown`])
//! - **Connections**: event producers and chat sinks ([`Connection`]) and the
//!   FIFO queue between them and the dispatcher ([`EventSender`])
//! - **Errors**: the recoverability classes handlers report ([`HandlerError`])
//!
//! ```text
//! ┌────────────┐  emit   ┌───────┐        ┌────────────┐  run   ┌─────────┐
//! │ Connection │───────▶│ queue │──────▶│ Dispatcher │──────▶│ Handler │
//! └────────────┘         └───────┘        └────────────┘        └─────────┘
//!       ▲                                        │ say
//!       └────────────────────────────────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod event;
pub mod user;

pub use connection::{Connection, EventReceiver, EventSender, event_queue};
pub use error::{
    ConnectionError, ConnectionResult, ErrorClass, HandlerError, HandlerResult,
};
pub use event::{BoxedEvent, Event, EventFilter, EventTag, Message, Shutdown};
pub use user::User;
