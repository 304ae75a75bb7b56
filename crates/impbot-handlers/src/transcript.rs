//! Chat transcript logging.

use impbot_core::{Event, HandlerError, Message};
use impbot_framework::Observer;
use tracing::info;

/// Logs every event, messages as `[connection] <user> text`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn new() -> Self {
        Self
    }
}

/// One transcript line for `event`.
pub fn transcript_line(event: &(dyn Event + 'static)) -> String {
    match event.as_any().downcast_ref::<Message>() {
        Some(message) => {
            let connection = message
                .reply_connection
                .as_ref()
                .map_or("-", |c| c.name());
            format!("[{connection}] <{}> {}", message.user, message.text)
        }
        None => event.event_name().to_string(),
    }
}

impl Observer for LoggingObserver {
    type Event = dyn Event;

    fn observe(&mut self, event: &Self::Event) -> Result<(), HandlerError> {
        info!(target: "impbot::transcript", "{}", transcript_line(event));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impbot_core::{Connection, ConnectionResult, EventSender, Shutdown, User};
    use std::sync::Arc;

    struct Twitch;

    impl Connection for Twitch {
        fn name(&self) -> &str {
            "twitch"
        }

        fn run(self: Arc<Self>, _events: EventSender) -> ConnectionResult<()> {
            Ok(())
        }

        fn shutdown(&self) {}
    }

    #[test]
    fn test_message_line() {
        let message = Message::new(User::new("twitch", "Alicia"), "hi there")
            .with_reply_connection(Arc::new(Twitch));
        assert_eq!(transcript_line(&message), "[twitch] <Alicia> hi there");
    }

    #[test]
    fn test_message_without_connection() {
        let message = Message::new(User::new("web", "Alicia"), "hi");
        assert_eq!(transcript_line(&message), "[-] <Alicia> hi");
    }

    #[test]
    fn test_other_events_use_their_name() {
        assert_eq!(transcript_line(&Shutdown), Shutdown.event_name());
        assert!(LoggingObserver::new().observe(&Shutdown).is_ok());
    }
}
