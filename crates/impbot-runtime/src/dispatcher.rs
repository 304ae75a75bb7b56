//! The ordered handler list and per-event dispatch.
//!
//! Every observer whose declared event type admits the event sees it first.
//! Then handlers are tried in registration order. The first one whose
//! declared event type admits the event and whose `check` accepts it runs;
//! no other handler sees that event.

use std::collections::HashMap;

use impbot_core::{BoxedEvent, ErrorClass, Event, EventTag};
use impbot_framework::{BoxedHandler, BoxedObserver, DeferredWorkHandler};
use tracing::{Level, debug, error, info, span, trace, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Reply sent when a handler fails for operational reasons.
pub const GENERIC_FAILURE_REPLY: &str = "Uh oh!";

struct Registered {
    tag: EventTag,
    handler: BoxedHandler,
}

struct Watching {
    tag: EventTag,
    observer: BoxedObserver,
}

/// Routes events to the first handler that claims them.
pub struct Dispatcher {
    observers: Vec<Watching>,
    handlers: Vec<Registered>,
    started: bool,
}

impl Dispatcher {
    /// Builds the handler list, prepending the deferred-work handler.
    ///
    /// Fails if two handlers register the same command.
    pub fn new(handlers: Vec<BoxedHandler>) -> RuntimeResult<Self> {
        check_duplicate_commands(&handlers)?;

        let builtin: BoxedHandler = Box::new(DeferredWorkHandler);
        let handlers = std::iter::once(builtin)
            .chain(handlers)
            .map(|handler| Registered {
                tag: handler.event_tag(),
                handler,
            })
            .collect();

        Ok(Self {
            observers: Vec::new(),
            handlers,
            started: false,
        })
    }

    /// Adds observers, notified in the order given.
    pub fn with_observers(mut self, observers: Vec<BoxedObserver>) -> Self {
        self.observers.extend(observers.into_iter().map(|observer| Watching {
            tag: observer.event_tag(),
            observer,
        }));
        self
    }

    /// Number of handlers, the built-in one included.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Always false once built; the deferred-work handler is built in.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names in dispatch order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers
            .iter()
            .map(|r| r.handler.handler_name())
            .collect()
    }

    /// Runs every handler's startup hook. Later calls do nothing.
    pub fn startup(&mut self) -> RuntimeResult<()> {
        if self.started {
            return Ok(());
        }
        for registered in &mut self.handlers {
            let handler = registered.handler.handler_name();
            registered
                .handler
                .start()
                .map_err(|source| RuntimeError::Startup { handler, source })?;
            trace!(handler, "Handler started");
        }
        self.started = true;
        info!(handlers = self.handlers.len(), "Handlers started");
        Ok(())
    }

    /// Dispatches one event. Returns whether a handler claimed it.
    ///
    /// User errors are replied to the sender. Operational errors are logged
    /// and answered with [`GENERIC_FAILURE_REPLY`]. Invariant errors, and
    /// replies that cannot be delivered at all, are returned.
    pub fn dispatch(&mut self, event: &BoxedEvent) -> RuntimeResult<bool> {
        let event: &(dyn Event + 'static) = &**event;
        let span = span!(Level::DEBUG, "dispatch", event = event.event_name());
        let _enter = span.enter();

        self.notify_observers(event)?;

        let Some(registered) = self
            .handlers
            .iter_mut()
            .find_map(|r| (r.tag.admits(event) && r.handler.check_event(event)).then_some(r))
        else {
            trace!("No handler claimed the event");
            return Ok(false);
        };

        let handler = registered.handler.handler_name();
        debug!(handler, "Handling event");

        match registered.handler.run_event(event) {
            Ok(Some(reply)) if !reply.is_empty() => reply_to(event, &reply)?,
            Ok(_) => {}
            Err(err) => match err.class() {
                ErrorClass::User => {
                    let text = err.to_string();
                    if !text.is_empty() {
                        reply_to(event, &text)?;
                    }
                }
                ErrorClass::Operational => {
                    error!(handler, error = %err, "Handler failed");
                    if event.reply_connection().is_some() {
                        reply_to(event, GENERIC_FAILURE_REPLY)?;
                    }
                }
                ErrorClass::Fatal => {
                    return Err(RuntimeError::HandlerInvariant {
                        handler,
                        source: err,
                    });
                }
            },
        }
        Ok(true)
    }

    /// Offers the event to every matching observer. Observer failures are
    /// logged and never stop the handler scan, except invariant errors.
    fn notify_observers(&mut self, event: &(dyn Event + 'static)) -> RuntimeResult<()> {
        for watching in self.observers.iter_mut().filter(|w| w.tag.admits(event)) {
            let observer = watching.observer.observer_name();
            if let Err(err) = watching.observer.observe_event(event) {
                match err.class() {
                    ErrorClass::Fatal => {
                        return Err(RuntimeError::HandlerInvariant {
                            handler: observer,
                            source: err,
                        });
                    }
                    _ => warn!(observer, error = %err, "Observer failed"),
                }
            }
        }
        Ok(())
    }
}

fn reply_to(event: &(dyn Event + 'static), text: &str) -> RuntimeResult<()> {
    let connection = event
        .reply_connection()
        .ok_or(RuntimeError::NoReplyTarget {
            event: event.event_name(),
        })?;
    match connection.say(text) {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(RuntimeError::Reply(e)),
        Err(e) => {
            warn!(connection = connection.name(), error = %e, "Failed to send reply");
            Ok(())
        }
    }
}

fn check_duplicate_commands(handlers: &[BoxedHandler]) -> RuntimeResult<()> {
    let mut owners: HashMap<String, &'static str> = HashMap::new();
    for handler in handlers {
        let second = handler.handler_name();
        for command in handler.command_names() {
            if let Some(first) = owners.insert(command.clone(), second) {
                return Err(RuntimeError::DuplicateCommand {
                    command,
                    first,
                    second,
                });
            }
        }
    }
    Ok(())
}
