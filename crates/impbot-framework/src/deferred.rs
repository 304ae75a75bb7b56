//! Work handed to the dispatch thread from elsewhere.
//!
//! Threads that are not connections (web views, timers) must not touch
//! handler state directly. They wrap the work in a [`DeferredWork`] event and
//! enqueue it; the built-in [`DeferredWorkHandler`], which the dispatcher
//! always places first, runs it in queue order like any other event.

use std::any::Any;
use std::cell::Cell;
use std::fmt;

use impbot_core::{Event, HandlerError, HandlerResult};

use crate::handler::Handler;

type Work = Box<dyn FnOnce() + Send>;

/// An event carrying a callback to run on the dispatch thread.
pub struct DeferredWork {
    work: Cell<Option<Work>>,
}

impl DeferredWork {
    /// Wraps a callback.
    pub fn new(work: impl FnOnce() + Send + 'static) -> Self {
        Self {
            work: Cell::new(Some(Box::new(work))),
        }
    }

    /// Runs the callback. Returns `false` if it already ran.
    pub fn run(&self) -> bool {
        match self.work.take() {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }
}

impl Event for DeferredWork {
    fn event_name(&self) -> &'static str {
        "deferred_work"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for DeferredWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredWork").finish_non_exhaustive()
    }
}

/// Runs every [`DeferredWork`] event.
#[derive(Debug, Default)]
pub struct DeferredWorkHandler;

impl Handler for DeferredWorkHandler {
    type Event = DeferredWork;

    fn check(&mut self, _event: &DeferredWork) -> bool {
        true
    }

    fn run(&mut self, event: &DeferredWork) -> HandlerResult {
        if event.run() {
            Ok(None)
        } else {
            Err(HandlerError::invariant("deferred work was run twice"))
        }
    }
}
