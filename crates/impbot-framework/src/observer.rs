//! Observers: passive listeners that see every event of their type.
//!
//! Unlike handlers, observers never claim an event. The dispatcher offers
//! each event to every matching observer before it looks for a handler, so
//! an observer sees messages whether or not a handler answers them.

use impbot_core::{Event, EventFilter, EventTag, HandlerError};

/// A passive listener.
pub trait Observer: Send + 'static {
    /// The event type this observer sees. Use `dyn Event` to see everything.
    type Event: EventFilter + ?Sized;

    /// Called for every event of the declared type.
    fn observe(&mut self, event: &Self::Event) -> Result<(), HandlerError>;

    /// Name used in logs and error messages.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Object-safe view of an [`Observer`], used by the dispatcher.
pub trait ErasedObserver: Send {
    /// See [`Observer::name`].
    fn observer_name(&self) -> &'static str;

    /// The static tag of the observed event type.
    fn event_tag(&self) -> EventTag;

    /// Narrows the event and calls [`Observer::observe`]. Events of other
    /// types are ignored.
    fn observe_event(&mut self, event: &(dyn Event + 'static)) -> Result<(), HandlerError>;
}

impl<O: Observer> ErasedObserver for O {
    fn observer_name(&self) -> &'static str {
        self.name()
    }

    fn event_tag(&self) -> EventTag {
        <O::Event as EventFilter>::tag()
    }

    fn observe_event(&mut self, event: &(dyn Event + 'static)) -> Result<(), HandlerError> {
        match <O::Event as EventFilter>::filter(event) {
            Some(event) => self.observe(event),
            None => Ok(()),
        }
    }
}

/// A type-erased observer stored by the dispatcher.
pub type BoxedObserver = Box<dyn ErasedObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use impbot_core::{BoxedEvent, Message, Shutdown, User};

    #[derive(Default)]
    struct Transcript(Vec<String>);

    impl Observer for Transcript {
        type Event = Message;

        fn observe(&mut self, message: &Message) -> Result<(), HandlerError> {
            self.0.push(message.text.clone());
            Ok(())
        }
    }

    #[test]
    fn test_erased_observer_filters_by_type() {
        let mut transcript = Transcript::default();
        assert_eq!(
            ErasedObserver::event_tag(&transcript),
            EventTag::of::<Message>()
        );

        let message = BoxedEvent::new(Message::new(User::new("test", "alice"), "hi"));
        transcript.observe_event(&*message).unwrap();
        transcript.observe_event(&*BoxedEvent::new(Shutdown)).unwrap();

        assert_eq!(transcript.0, vec!["hi"]);
        assert!(transcript.observer_name().ends_with("Transcript"));
    }
}
