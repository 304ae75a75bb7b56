//! Event system for the impbot runtime.
//!
//! - [`Event`] - Base trait for everything that flows through the queue
//! - [`BoxedEvent`] - Owned, type-erased event
//! - [`EventTag`] / [`EventFilter`] - Static type tags used to route events
//!   to the handlers that declared interest in them
//! - [`Message`] / [`Shutdown`] - The two events the runtime itself knows
//!
//! Handlers declare the event type they accept as an associated type. The
//! dispatcher turns that into an [`EventTag`] once, at registration, and only
//! offers a handler the events its tag admits.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::connection::Connection;
use crate::user::User;

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events.
///
/// Events are type-erased as `dyn Event` while queued and downcast with
/// [`as_any`](Event::as_any) once a handler claims them.
pub trait Event: Any + Send {
    /// Returns the human-readable name of this event type.
    fn event_name(&self) -> &'static str;

    /// The connection replies should go to.
    ///
    /// `None` for events that intentionally take no chat response.
    fn reply_connection(&self) -> Option<&Arc<dyn Connection>> {
        None
    }

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

// ============================================================================
// Type Tags
// ============================================================================

/// A static description of which events a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTag {
    /// Every event.
    Any,
    /// Exactly one concrete event type.
    Type {
        /// The accepted type.
        id: TypeId,
        /// Its name, for logging.
        name: &'static str,
    },
}

impl EventTag {
    /// The tag for a concrete event type.
    pub fn of<E: Event>() -> Self {
        Self::Type {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    /// Whether an event of this runtime type is accepted.
    pub fn admits(&self, event: &(dyn Event + 'static)) -> bool {
        match self {
            Self::Any => true,
            Self::Type { id, .. } => event.as_any().type_id() == *id,
        }
    }

    /// Name of the accepted type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "any event",
            Self::Type { name, .. } => name,
        }
    }
}

/// Types a handler may declare as its accepted event.
///
/// Implemented for every concrete [`Event`], and for `dyn Event` to accept
/// everything.
pub trait EventFilter: 'static {
    /// The tag describing this filter.
    fn tag() -> EventTag;

    /// Narrows an event to this type, if it is one.
    fn filter<'a>(event: &'a (dyn Event + 'static)) -> Option<&'a Self>;
}

impl<E: Event> EventFilter for E {
    fn tag() -> EventTag {
        EventTag::of::<E>()
    }

    fn filter<'a>(event: &'a (dyn Event + 'static)) -> Option<&'a Self> {
        event.as_any().downcast_ref::<E>()
    }
}

impl EventFilter for dyn Event {
    fn tag() -> EventTag {
        EventTag::Any
    }

    fn filter<'a>(event: &'a (dyn Event + 'static)) -> Option<&'a Self> {
        Some(event)
    }
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased container for events that supports runtime downcasting.
///
/// `BoxedEvent` implements `Deref<Target = dyn Event>`, so trait methods can
/// be called on it directly.
pub struct BoxedEvent {
    inner: Box<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Box::new(event),
        }
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Whether the event is of type `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.inner.as_any().is::<E>()
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("has_reply", &self.reply_connection().is_some())
            .finish()
    }
}

// ============================================================================
// Built-in Events
// ============================================================================

/// A chat message.
#[derive(Clone)]
pub struct Message {
    /// Where replies to this message go.
    pub reply_connection: Option<Arc<dyn Connection>>,
    /// Who sent it.
    pub user: User,
    /// The raw text.
    pub text: String,
}

impl Message {
    /// Creates a message with no reply connection.
    pub fn new(user: User, text: impl Into<String>) -> Self {
        Self {
            reply_connection: None,
            user,
            text: text.into(),
        }
    }

    /// Sets the connection replies are sent to.
    pub fn with_reply_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.reply_connection = Some(connection);
        self
    }
}

impl Event for Message {
    fn event_name(&self) -> &'static str {
        "message"
    }

    fn reply_connection(&self) -> Option<&Arc<dyn Connection>> {
        self.reply_connection.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("connection", &self.reply_connection.as_ref().map(|c| c.name()))
            .field("user", &self.user)
            .field("text", &self.text)
            .finish()
    }
}

/// Poison pill that stops the dispatch loop.
///
/// Everything queued before it is handled; nothing after it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shutdown;

impl Event for Shutdown {
    fn event_name(&self) -> &'static str {
        "shutdown"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tick;

    impl Event for Tick {
        fn event_name(&self) -> &'static str {
            "tick"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn message() -> BoxedEvent {
        BoxedEvent::new(Message::new(User::new("test", "alice"), "hi"))
    }

    #[test]
    fn test_tag_admits_only_its_type() {
        let msg = message();
        let tick = BoxedEvent::new(Tick);

        let tag = EventTag::of::<Message>();
        assert!(tag.admits(&*msg));
        assert!(!tag.admits(&*tick));
        assert!(EventTag::Any.admits(&*tick));
    }

    #[test]
    fn test_filter_downcasts() {
        let msg = message();
        let narrowed = Message::filter(&*msg).unwrap();
        assert_eq!(narrowed.text, "hi");
        assert!(Tick::filter(&*msg).is_none());
        assert!(<dyn Event>::filter(&*msg).is_some());
    }

    #[test]
    fn test_boxed_event_downcast() {
        let event = BoxedEvent::new(Shutdown);
        assert!(event.is::<Shutdown>());
        assert!(event.downcast_ref::<Message>().is_none());
        assert!(event.reply_connection().is_none());
        assert_eq!(event.event_name(), "shutdown");
    }
}
