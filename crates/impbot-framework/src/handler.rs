//! Handler system for the impbot runtime.
//!
//! A [`Handler`] declares the one event type it accepts as an associated
//! type. The dispatcher only offers it events of that type, then asks
//! [`check`](Handler::check) whether it wants this particular one and, if so,
//! calls [`run`](Handler::run).
//!
//! ```rust,ignore
//! struct Greeter;
//!
//! impl Handler for Greeter {
//!     type Event = Message;
//!
//!     fn check(&mut self, message: &Message) -> bool {
//!         message.text == "hi"
//!     }
//!
//!     fn run(&mut self, message: &Message) -> HandlerResult {
//!         Ok(Some(format!("Hi, {}!", message.user)))
//!     }
//! }
//! ```
//!
//! Handlers all run on the dispatch thread, one event at a time, so they
//! take `&mut self` and need no locking.

use impbot_core::{Event, EventFilter, EventTag, HandlerError, HandlerResult};

// ============================================================================
// Handler Trait
// ============================================================================

/// A pluggable behaviour.
pub trait Handler: Send + 'static {
    /// The event type this handler accepts. Use `dyn Event` to see everything.
    type Event: EventFilter + ?Sized;

    /// Whether this handler wants to handle the event.
    fn check(&mut self, event: &Self::Event) -> bool;

    /// Handles the event, optionally returning a reply.
    fn run(&mut self, event: &Self::Event) -> HandlerResult;

    /// Runs once on the dispatch thread, after the store is open and before
    /// the first event.
    fn startup(&mut self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Name used in logs and error messages.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Chat commands this handler answers to, marker included.
    fn commands(&self) -> Vec<String> {
        Vec::new()
    }
}

// ============================================================================
// Type Erasure
// ============================================================================

/// Object-safe view of a [`Handler`], used by the dispatcher.
pub trait ErasedHandler: Send {
    /// See [`Handler::name`].
    fn handler_name(&self) -> &'static str;

    /// The static tag of the accepted event type.
    fn event_tag(&self) -> EventTag;

    /// Narrows the event and calls [`Handler::check`].
    ///
    /// Events of other types are never wanted.
    fn check_event(&mut self, event: &(dyn Event + 'static)) -> bool;

    /// Narrows the event and calls [`Handler::run`].
    fn run_event(&mut self, event: &(dyn Event + 'static)) -> HandlerResult;

    /// See [`Handler::startup`].
    fn start(&mut self) -> Result<(), HandlerError>;

    /// See [`Handler::commands`].
    fn command_names(&self) -> Vec<String>;
}

impl<H: Handler> ErasedHandler for H {
    fn handler_name(&self) -> &'static str {
        self.name()
    }

    fn event_tag(&self) -> EventTag {
        <H::Event as EventFilter>::tag()
    }

    fn check_event(&mut self, event: &(dyn Event + 'static)) -> bool {
        match <H::Event as EventFilter>::filter(event) {
            Some(event) => self.check(event),
            None => false,
        }
    }

    fn run_event(&mut self, event: &(dyn Event + 'static)) -> HandlerResult {
        let narrowed = <H::Event as EventFilter>::filter(event).ok_or_else(|| {
            HandlerError::invariant(format!(
                "{} was given a '{}' event it does not accept",
                self.name(),
                event.event_name()
            ))
        })?;
        self.run(narrowed)
    }

    fn start(&mut self) -> Result<(), HandlerError> {
        self.startup()
    }

    fn command_names(&self) -> Vec<String> {
        self.commands()
    }
}

/// A type-erased handler stored by the dispatcher.
pub type BoxedHandler = Box<dyn ErasedHandler>;
