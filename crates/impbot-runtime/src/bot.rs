//! Bot lifecycle: construction, the dispatch thread, connection workers and
//! shutdown.
//!
//! ```rust,ignore
//! let bot = Bot::builder()
//!     .database("impbot.db")
//!     .connection(StdioConnection::stdio(User::new("console", "stdin")))
//!     .handler(CommandHandler::new(Hello)?)
//!     .build()?;
//! let handle = bot.handle();
//! ctrlc::set_handler(move || handle.shutdown())?;
//! let report = bot.main()?;
//! Ok(report.exit_code())
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use impbot_core::{
    Connection, ConnectionResult, Event, EventReceiver, EventSender, Shutdown, event_queue,
};
use impbot_data::Store;
use impbot_framework::{BoxedHandler, BoxedObserver, Handler, Observer};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::delegate::Delegator;
use crate::dispatcher::Dispatcher;
use crate::error::{RuntimeError, RuntimeResult};

/// Name of the thread that runs handlers.
pub const DISPATCH_THREAD: &str = "event-handler";

/// Where the bot is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    /// Built; no threads started yet.
    Constructed,
    /// Connections and the dispatch thread are running.
    Running,
    /// Dispatch has ended; connections are being stopped and joined.
    Draining,
    /// Everything is joined or abandoned and the store is closed.
    Stopped,
}

// =============================================================================
// Shutdown Report
// =============================================================================

/// How the connection threads ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Connections still running when the join timeout expired.
    pub stalled: Vec<String>,
    /// Connections whose `run` returned an error or panicked.
    pub failed: Vec<String>,
}

impl ShutdownReport {
    /// Every connection returned cleanly in time.
    pub fn is_graceful(&self) -> bool {
        self.stalled.is_empty() && self.failed.is_empty()
    }

    /// Success only for a graceful shutdown.
    pub fn exit_code(&self) -> ExitCode {
        if self.is_graceful() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// A cloneable, thread-safe remote for a bot.
#[derive(Clone, Debug)]
pub struct BotHandle {
    events: EventSender,
    state: Arc<RwLock<BotState>>,
}

impl BotHandle {
    /// Enqueues the shutdown pill. Events already queued are still handled.
    pub fn shutdown(&self) {
        if self.events.emit(Shutdown).is_err() {
            debug!("Shutdown requested after the dispatch loop ended");
        }
    }

    /// Enqueues an event as if a connection had produced it.
    pub fn emit<E: Event>(&self, event: E) -> ConnectionResult<()> {
        self.events.emit(event)
    }

    /// A sender for code that produces events itself.
    pub fn emitter(&self) -> EventSender {
        self.events.clone()
    }

    /// A bridge for running closures on the dispatch thread.
    pub fn delegator(&self) -> Delegator {
        Delegator::new(self.events.clone())
    }

    /// The bot's current lifecycle state.
    pub fn state(&self) -> BotState {
        *self.state.read()
    }
}

// =============================================================================
// Bot
// =============================================================================

/// Owns the event queue, the connections and the handlers.
pub struct Bot {
    connections: Vec<Arc<dyn Connection>>,
    dispatcher: Dispatcher,
    events: EventSender,
    queue: EventReceiver,
    store: Option<Store>,
    shutdown_timeout: Duration,
    state: Arc<RwLock<BotState>>,
}

struct Worker {
    name: String,
    done: crossbeam_channel::Receiver<ConnectionResult<()>>,
    thread: thread::JoinHandle<()>,
}

impl Bot {
    /// Builds a bot from already-boxed parts.
    pub fn new(
        database: Option<&Path>,
        connections: Vec<Arc<dyn Connection>>,
        handlers: Vec<BoxedHandler>,
    ) -> RuntimeResult<Self> {
        let mut builder = BotBuilder::new();
        builder.database = database.map(Path::to_path_buf);
        builder.connections = connections;
        builder.handlers = handlers;
        builder.build()
    }

    /// Starts a [`BotBuilder`] with default settings.
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    /// A handle that stays valid after [`main`](Bot::main) takes the bot.
    pub fn handle(&self) -> BotHandle {
        BotHandle {
            events: self.events.clone(),
            state: Arc::clone(&self.state),
        }
    }

    /// The bot's current lifecycle state.
    pub fn state(&self) -> BotState {
        *self.state.read()
    }

    /// Handler names in dispatch order, the built-in one first.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.dispatcher.handler_names()
    }

    fn set_state(state: &RwLock<BotState>, next: BotState) {
        *state.write() = next;
        debug!(state = ?next, "Bot state changed");
    }

    /// Runs until a [`Shutdown`] event is handled or a handler breaks an
    /// invariant, then stops the connections and closes the store.
    pub fn main(self) -> RuntimeResult<ShutdownReport> {
        let Bot {
            connections,
            mut dispatcher,
            events,
            queue,
            store,
            shutdown_timeout,
            state,
        } = self;

        Self::set_state(&state, BotState::Running);
        info!(
            connections = connections.len(),
            handlers = dispatcher.len(),
            "Starting bot"
        );

        let dispatch = thread::Builder::new()
            .name(DISPATCH_THREAD.to_string())
            .spawn(move || -> RuntimeResult<()> {
                dispatcher.startup()?;
                while let Some(event) = queue.recv() {
                    if event.is::<Shutdown>() {
                        info!(pending = queue.len(), "Shutdown requested");
                        break;
                    }
                    dispatcher.dispatch(&event)?;
                }
                Ok(())
            })
            .map_err(|e| RuntimeError::spawn(DISPATCH_THREAD, e))?;

        let stopping = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(connections.len());
        for connection in &connections {
            match spawn_worker(connection, &events, &stopping) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Without this worker the bot is incomplete; stop the rest.
                    error!(error = %e, "Failed to start connection");
                    let _ = events.emit(Shutdown);
                    break;
                }
            }
        }

        let dispatched = dispatch
            .join()
            .unwrap_or(Err(RuntimeError::DispatchPanicked));
        Self::set_state(&state, BotState::Draining);
        stopping.store(true, Ordering::SeqCst);
        if let Err(e) = &dispatched {
            error!(error = %e, "Dispatch loop stopped on a fatal error");
        }

        for connection in &connections {
            connection.shutdown();
        }
        let report = join_workers(workers, shutdown_timeout);

        if let Some(store) = store {
            store.close();
        }
        Self::set_state(&state, BotState::Stopped);
        info!(graceful = report.is_graceful(), "Bot stopped");

        dispatched.map(|()| report)
    }
}

fn spawn_worker(
    connection: &Arc<dyn Connection>,
    events: &EventSender,
    stopping: &Arc<AtomicBool>,
) -> RuntimeResult<Worker> {
    let name = connection.name().to_string();
    let (done_tx, done) = crossbeam_channel::bounded(1);
    let connection = Arc::clone(connection);
    let events = events.clone();
    let stopping = Arc::clone(stopping);
    let thread_name = name.clone();

    let thread = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            debug!(connection = %thread_name, "Connection started");
            let result = connection.run(events);
            match &result {
                Ok(()) if stopping.load(Ordering::SeqCst) => {
                    debug!(connection = %thread_name, "Connection stopped");
                }
                Ok(()) => info!(connection = %thread_name, "Connection finished, transport is gone"),
                Err(e) => error!(connection = %thread_name, error = %e, "Connection failed"),
            }
            let _ = done_tx.send(result);
        })
        .map_err(|e| RuntimeError::spawn(name.clone(), e))?;

    Ok(Worker { name, done, thread })
}

fn join_workers(workers: Vec<Worker>, timeout: Duration) -> ShutdownReport {
    let mut report = ShutdownReport::default();
    for worker in workers {
        match worker.done.recv_timeout(timeout) {
            Ok(result) => {
                let panicked = worker.thread.join().is_err();
                if result.is_err() || panicked {
                    report.failed.push(worker.name);
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(connection = %worker.name, "Connection thread panicked");
                let _ = worker.thread.join();
                report.failed.push(worker.name);
            }
            // Left detached; the process exits non-zero.
            Err(RecvTimeoutError::Timeout) => report.stalled.push(worker.name),
        }
    }
    if !report.stalled.is_empty() {
        error!(threads = ?report.stalled, "Threads still running after shutdown");
    }
    report
}

// =============================================================================
// Builder
// =============================================================================

/// Collects connections and handlers, then opens the store.
pub struct BotBuilder {
    database: Option<PathBuf>,
    connections: Vec<Arc<dyn Connection>>,
    observers: Vec<BoxedObserver>,
    handlers: Vec<BoxedHandler>,
    shutdown_timeout: Duration,
}

impl Default for BotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BotBuilder {
    /// A builder with the default [`BotConfig`].
    pub fn new() -> Self {
        Self::from_config(&BotConfig::default())
    }

    /// A builder using the database and shutdown timeout from `config`.
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            database: config.database.clone(),
            connections: Vec::new(),
            observers: Vec::new(),
            handlers: Vec::new(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    /// SQLite file to open. Without one, storage calls fail.
    pub fn database<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.database = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a connection, run on its own thread.
    pub fn connection<C: Connection>(mut self, connection: C) -> Self {
        self.connections.push(Arc::new(connection));
        self
    }

    /// Adds a connection the caller also keeps a reference to.
    pub fn shared_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connections.push(connection);
        self
    }

    /// Appends an observer. Observers see every matching event before any
    /// handler does.
    pub fn observer<O: Observer>(mut self, observer: O) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Appends a handler. Handlers are tried in the order they are added.
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Appends an already-boxed handler.
    pub fn boxed_handler(mut self, handler: BoxedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// How long to wait for each connection thread after shutdown.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Checks for duplicate commands and opens the store.
    pub fn build(self) -> RuntimeResult<Bot> {
        let dispatcher = Dispatcher::new(self.handlers)?.with_observers(self.observers);
        let store = match &self.database {
            Some(path) => Some(Store::open(path)?),
            None => {
                warn!("No database configured, handlers can't use storage");
                None
            }
        };
        let (events, queue) = event_queue();

        Ok(Bot {
            connections: self.connections,
            dispatcher,
            events,
            queue,
            store,
            shutdown_timeout: self.shutdown_timeout,
            state: Arc::new(RwLock::new(BotState::Constructed)),
        })
    }
}
