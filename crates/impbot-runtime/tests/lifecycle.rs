use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use impbot_core::{
    Connection, ConnectionError, ConnectionResult, EventSender, HandlerError, HandlerResult,
    Message, Shutdown, User,
};
use impbot_data::Namespace;
use impbot_framework::{
    CommandHandler, CommandRegistry, CommandResult, Commands, Handler, Observer,
};
use impbot_runtime::{Bot, BotState, DISPATCH_THREAD, RuntimeError};
use parking_lot::Mutex;
use serial_test::serial;

/// Emits a fixed script of messages, then waits to be stopped.
struct ScriptConnection {
    name: &'static str,
    script: Vec<&'static str>,
    said: Mutex<Vec<String>>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl ScriptConnection {
    fn new(name: &'static str, script: Vec<&'static str>) -> Arc<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        Arc::new(Self {
            name,
            script,
            said: Mutex::new(Vec::new()),
            stop_tx,
            stop_rx,
        })
    }
}

impl Connection for ScriptConnection {
    fn name(&self) -> &str {
        self.name
    }

    fn run(self: Arc<Self>, events: EventSender) -> ConnectionResult<()> {
        let reply: Arc<dyn Connection> = self.clone();
        for line in &self.script {
            // The queue closes once the dispatcher stops; later lines are dropped.
            let _ = if *line == "<shutdown>" {
                events.emit(Shutdown)
            } else {
                events.emit(
                    Message::new(User::new("script", "alice"), *line)
                        .with_reply_connection(reply.clone()),
                )
            };
        }
        let _ = self.stop_rx.recv();
        Ok(())
    }

    fn shutdown(&self) {
        let _ = self.stop_tx.try_send(());
    }

    fn say(&self, text: &str) -> ConnectionResult<()> {
        self.said.lock().push(text.to_string());
        Ok(())
    }
}

/// Emits one line per turn token, acknowledging each emit.
struct RelayConnection {
    name: &'static str,
    lines: Vec<&'static str>,
    turns: Receiver<()>,
    emitted: Sender<()>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl RelayConnection {
    /// Returns the connection, its turn sender and its acknowledgement receiver.
    fn new(name: &'static str, lines: Vec<&'static str>) -> (Self, Sender<()>, Receiver<()>) {
        let (turn_tx, turns) = crossbeam_channel::unbounded();
        let (emitted, ack_rx) = crossbeam_channel::unbounded();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let connection = Self {
            name,
            lines,
            turns,
            emitted,
            stop_tx,
            stop_rx,
        };
        (connection, turn_tx, ack_rx)
    }
}

impl Connection for RelayConnection {
    fn name(&self) -> &str {
        self.name
    }

    fn run(self: Arc<Self>, events: EventSender) -> ConnectionResult<()> {
        let reply: Arc<dyn Connection> = self.clone();
        for line in &self.lines {
            if self.turns.recv().is_err() {
                break;
            }
            let _ = events.emit(
                Message::new(User::new("relay", self.name), *line)
                    .with_reply_connection(reply.clone()),
            );
            let _ = self.emitted.send(());
        }
        let _ = self.stop_rx.recv();
        Ok(())
    }

    fn shutdown(&self) {
        let _ = self.stop_tx.try_send(());
    }

    fn say(&self, _text: &str) -> ConnectionResult<()> {
        Ok(())
    }
}

/// Records every message, claimed or not.
struct Transcript {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Observer for Transcript {
    type Event = Message;

    fn observe(&mut self, message: &Message) -> Result<(), HandlerError> {
        self.seen.lock().push(message.text.clone());
        Ok(())
    }
}

/// Ignores shutdown requests.
struct StuckConnection;

impl Connection for StuckConnection {
    fn name(&self) -> &str {
        "stuck"
    }

    fn run(self: Arc<Self>, _events: EventSender) -> ConnectionResult<()> {
        thread::sleep(Duration::from_secs(2));
        Ok(())
    }

    fn shutdown(&self) {}
}

/// Fails as soon as it starts.
struct BrokenConnection;

impl Connection for BrokenConnection {
    fn name(&self) -> &str {
        "broken"
    }

    fn run(self: Arc<Self>, _events: EventSender) -> ConnectionResult<()> {
        Err(ConnectionError::transport("connection refused"))
    }

    fn shutdown(&self) {}
}

/// Echoes every message and remembers what it saw.
struct Echo {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Handler for Echo {
    type Event = Message;

    fn check(&mut self, _message: &Message) -> bool {
        true
    }

    fn run(&mut self, message: &Message) -> HandlerResult {
        if message.text == "explode" {
            return Err(HandlerError::invariant("exploded"));
        }
        self.seen.lock().push(message.text.clone());
        Ok(Some(format!("echo: {}", message.text)))
    }
}

#[test]
fn test_fifo_and_shutdown_drains_prefix() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let connection = ScriptConnection::new("script", vec!["one", "two", "three", "<shutdown>", "late"]);
    let bot = Bot::builder()
        .shared_connection(connection.clone())
        .handler(Echo { seen: seen.clone() })
        .build()
        .unwrap();
    let handle = bot.handle();

    let report = bot.main().unwrap();

    assert!(report.is_graceful());
    assert_eq!(*seen.lock(), vec!["one", "two", "three"]);
    assert_eq!(
        *connection.said.lock(),
        vec!["echo: one", "echo: two", "echo: three"]
    );
    assert_eq!(handle.state(), BotState::Stopped);
}

#[test]
fn test_fifo_across_connections() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::new(Mutex::new(Vec::new()));
    let (a, a_turn, a_ack) = RelayConnection::new("a", vec!["a1", "a2", "a3"]);
    let (b, b_turn, b_ack) = RelayConnection::new("b", vec!["b1", "b2", "b3"]);
    let bot = Bot::builder()
        .connection(a)
        .connection(b)
        .observer(Transcript {
            seen: observed.clone(),
        })
        .handler(Echo { seen: seen.clone() })
        .build()
        .unwrap();
    let handle = bot.handle();

    let order = [
        (&a_turn, &a_ack),
        (&b_turn, &b_ack),
        (&b_turn, &b_ack),
        (&a_turn, &a_ack),
        (&b_turn, &b_ack),
        (&a_turn, &a_ack),
    ];
    thread::scope(|scope| {
        scope.spawn(|| {
            for (turn, ack) in order {
                turn.send(()).unwrap();
                ack.recv().unwrap();
            }
            handle.shutdown();
        });

        let report = bot.main().unwrap();
        assert!(report.is_graceful());
    });

    let expected = vec!["a1", "b1", "b2", "a2", "b3", "a3"];
    assert_eq!(*seen.lock(), expected);
    assert_eq!(*observed.lock(), expected);
}

struct Foo;

impl Foo {
    fn foo(&mut self, _message: &Message) -> HandlerResult {
        Ok(Some("foo".into()))
    }
}

impl Commands for Foo {
    fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()> {
        commands.command("foo", &[], Self::foo)?;
        Ok(())
    }
}

struct OtherFoo;

impl OtherFoo {
    fn foo(&mut self, _message: &Message) -> HandlerResult {
        Ok(Some("other foo".into()))
    }
}

impl Commands for OtherFoo {
    fn register(commands: &mut CommandRegistry<Self>) -> CommandResult<()> {
        commands.command("foo", &[], Self::foo)?;
        Ok(())
    }
}

#[test]
fn test_duplicate_command_across_handlers_fails_build() {
    let err = Bot::builder()
        .handler(CommandHandler::new(Foo).unwrap())
        .handler(CommandHandler::new(OtherFoo).unwrap())
        .build()
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RuntimeError::DuplicateCommand { ref command, .. } if command == "!foo"
    ));
}

#[test]
fn test_stalled_connection_is_reported() {
    let connection = ScriptConnection::new("script", vec!["<shutdown>"]);
    let bot = Bot::builder()
        .shared_connection(connection)
        .connection(StuckConnection)
        .shutdown_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let report = bot.main().unwrap();

    assert!(!report.is_graceful());
    assert_eq!(report.stalled, vec!["stuck".to_string()]);
    assert!(report.failed.is_empty());
}

#[test]
fn test_failed_connection_does_not_stop_the_bot() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let connection = ScriptConnection::new("script", vec!["hi", "<shutdown>"]);
    let bot = Bot::builder()
        .connection(BrokenConnection)
        .shared_connection(connection)
        .handler(Echo { seen: seen.clone() })
        .build()
        .unwrap();

    let report = bot.main().unwrap();

    assert_eq!(report.failed, vec!["broken".to_string()]);
    assert_eq!(*seen.lock(), vec!["hi"]);
}

#[test]
fn test_invariant_error_ends_dispatch() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let connection = ScriptConnection::new("script", vec!["explode", "after"]);
    let bot = Bot::builder()
        .shared_connection(connection.clone())
        .handler(Echo { seen: seen.clone() })
        .build()
        .unwrap();

    let err = bot.main().unwrap_err();

    assert!(matches!(err, RuntimeError::HandlerInvariant { .. }));
    assert!(seen.lock().is_empty());
    assert!(connection.said.lock().is_empty());
}

#[test]
fn test_delegated_work_runs_on_dispatch_thread() {
    let connection = ScriptConnection::new("script", Vec::new());
    let bot = Bot::builder()
        .shared_connection(connection)
        .build()
        .unwrap();
    let handle = bot.handle();
    let runner = thread::spawn(move || bot.main());

    let thread_name = handle
        .delegator()
        .call(|| thread::current().name().map(str::to_string))
        .unwrap();
    assert_eq!(thread_name.as_deref(), Some(DISPATCH_THREAD));
    assert_eq!(handle.state(), BotState::Running);

    handle.shutdown();
    assert!(runner.join().unwrap().unwrap().is_graceful());
}

struct Counter {
    namespace: Namespace,
    count_at_startup: Arc<Mutex<Option<String>>>,
}

impl Handler for Counter {
    type Event = Message;

    fn startup(&mut self) -> Result<(), HandlerError> {
        *self.count_at_startup.lock() = Some(self.namespace.get_or("count", "0")?);
        Ok(())
    }

    fn check(&mut self, message: &Message) -> bool {
        message.text == "count"
    }

    fn run(&mut self, _message: &Message) -> HandlerResult {
        let count: i64 = self.namespace.get_or("count", "0")?.parse().unwrap_or(0);
        self.namespace.set("count", (count + 1).to_string())?;
        Ok(Some(format!("{}", count + 1)))
    }
}

#[test]
#[serial]
fn test_store_is_open_for_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bot.db");

    for expected in ["0", "2"] {
        let at_startup = Arc::new(Mutex::new(None));
        let connection = ScriptConnection::new("script", vec!["count", "count", "<shutdown>"]);
        let bot = Bot::builder()
            .database(&path)
            .shared_connection(connection.clone())
            .handler(Counter {
                namespace: Namespace::of::<Counter>(),
                count_at_startup: at_startup.clone(),
            })
            .build()
            .unwrap();

        assert!(bot.main().unwrap().is_graceful());
        assert_eq!(at_startup.lock().as_deref(), Some(expected));
        assert!(!impbot_data::is_open());
    }
}
