//! Running work on the dispatch thread from any other thread.
//!
//! Handlers are only ever touched by the dispatch thread. Code on another
//! thread (a web callback, a timer) that needs handler state wraps the work
//! in a [`DeferredWork`] event and blocks until the dispatcher has run it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use impbot_core::EventSender;
use impbot_framework::DeferredWork;
use thiserror::Error;

/// Why delegated work produced no value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DelegateError {
    /// The bot stopped before the work ran.
    #[error("the bot is not running")]
    NotRunning,

    /// The work panicked on the dispatch thread.
    #[error("delegated work panicked: {0}")]
    Panicked(String),
}

/// Hands closures to the dispatch thread and waits for their results.
#[derive(Clone, Debug)]
pub struct Delegator {
    events: EventSender,
}

impl Delegator {
    /// A delegator that queues work on `events`.
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }

    /// Runs `work` on the dispatch thread and returns what it returned.
    ///
    /// Blocks the caller. Calling this from the dispatch thread itself
    /// deadlocks.
    pub fn call<T, F>(&self, work: F) -> Result<T, DelegateError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.events
            .emit(DeferredWork::new(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(work)).map_err(panic_message);
                let _ = tx.send(result);
            }))
            .map_err(|_| DelegateError::NotRunning)?;

        // Dropping the queued event without running it disconnects the channel.
        rx.recv()
            .map_err(|_| DelegateError::NotRunning)?
            .map_err(DelegateError::Panicked)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impbot_core::event_queue;
    use std::thread;

    fn serve_one(queue: impbot_core::EventReceiver) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let event = queue.recv().unwrap();
            event.downcast_ref::<DeferredWork>().unwrap().run();
        })
    }

    #[test]
    fn test_call_returns_value() {
        let (events, queue) = event_queue();
        let worker = serve_one(queue);
        let delegator = Delegator::new(events);
        assert_eq!(delegator.call(|| 6 * 7), Ok(42));
        worker.join().unwrap();
    }

    #[test]
    fn test_call_reports_panic() {
        let (events, queue) = event_queue();
        let worker = serve_one(queue);
        let delegator = Delegator::new(events);
        let result: Result<(), _> = delegator.call(|| panic!("boom"));
        assert_eq!(result, Err(DelegateError::Panicked("boom".to_string())));
        worker.join().unwrap();
    }

    #[test]
    fn test_call_after_queue_closed() {
        let (events, queue) = event_queue();
        drop(queue);
        let delegator = Delegator::new(events);
        assert_eq!(delegator.call(|| 1), Err(DelegateError::NotRunning));
    }

    #[test]
    fn test_dropped_work_is_not_running() {
        let (events, queue) = event_queue();
        let dropper = thread::spawn(move || {
            let _ = queue.recv();
        });
        let delegator = Delegator::new(events);
        assert_eq!(delegator.call(|| 1), Err(DelegateError::NotRunning));
        dropper.join().unwrap();
    }
}
