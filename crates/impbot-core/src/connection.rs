//! Connections and the event queue they feed.
//!
//! A [`Connection`] runs on its own thread, pushing events into the shared
//! queue through an [`EventSender`] until it is told to stop. The dispatcher
//! owns the matching [`EventReceiver`].

use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{ConnectionError, ConnectionResult};
use crate::event::{BoxedEvent, Event};

/// A source of events, and optionally a place to send chat replies.
///
/// Implementations use interior mutability: `shutdown` is called from a
/// different thread than `run`, and `say` from the dispatch thread.
pub trait Connection: Send + Sync + 'static {
    /// A short name for logs and thread names.
    fn name(&self) -> &str;

    /// Produces events until [`shutdown`](Connection::shutdown) is called or
    /// the transport is permanently gone.
    ///
    /// Recoverable transport failures are retried internally; returning an
    /// error means the connection cannot continue.
    fn run(self: Arc<Self>, events: EventSender) -> ConnectionResult<()>;

    /// Makes a running [`run`](Connection::run) return promptly.
    fn shutdown(&self);

    /// Sends a chat message.
    ///
    /// Connections that cannot chat keep the default, which fails with
    /// [`ConnectionError::NotChat`].
    fn say(&self, text: &str) -> ConnectionResult<()> {
        let _ = text;
        Err(ConnectionError::NotChat {
            connection: self.name().to_string(),
        })
    }
}

/// Creates the process-wide FIFO event queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventSender { inner: tx }, EventReceiver { inner: rx })
}

/// The sending half of the event queue. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EventSender {
    inner: Sender<BoxedEvent>,
}

impl EventSender {
    /// Enqueues an event.
    pub fn emit<E: Event>(&self, event: E) -> ConnectionResult<()> {
        self.emit_boxed(BoxedEvent::new(event))
    }

    /// Enqueues an already boxed event.
    pub fn emit_boxed(&self, event: BoxedEvent) -> ConnectionResult<()> {
        self.inner
            .send(event)
            .map_err(|_| ConnectionError::QueueClosed)
    }
}

/// The receiving half of the event queue.
#[derive(Debug)]
pub struct EventReceiver {
    inner: Receiver<BoxedEvent>,
}

impl EventReceiver {
    /// Blocks until the next event. `None` once every sender is gone.
    pub fn recv(&self) -> Option<BoxedEvent> {
        self.inner.recv().ok()
    }

    /// Like [`recv`](Self::recv), giving up after `timeout`.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Result<BoxedEvent, RecvTimeoutError> {
        self.inner.recv_timeout(timeout)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
