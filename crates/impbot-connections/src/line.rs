//! A chat connection over any line-oriented reader and writer.
//!
//! Each non-blank input line becomes a [`Message`] from one fixed user;
//! replies are written back as lines. Reads happen on a helper thread so
//! that [`shutdown`](Connection::shutdown) can interrupt a blocked read.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, select};
use impbot_core::{
    Connection, ConnectionError, ConnectionResult, EventSender, Message, User,
};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use crate::retry::{Backoff, RetryConfig};

type Source<R> = Box<dyn FnMut() -> io::Result<R> + Send>;

enum ReadEvent {
    Line(String),
    Failed(io::Error),
    Eof,
}

enum Pumped {
    Stopped,
    Eof,
    Failed(io::Error),
}

/// Reads messages from `R` and writes replies to `W`.
pub struct LineConnection<R, W> {
    name: String,
    user: User,
    source: Mutex<Source<R>>,
    writer: Mutex<W>,
    retry: RetryConfig,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl<R, W> LineConnection<R, W>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    /// A connection over a reader that can't be reopened. A read error is
    /// final.
    pub fn new(name: impl Into<String>, user: User, reader: R, writer: W) -> Self {
        let mut reader = Some(reader);
        Self::with_source(
            name,
            user,
            move || {
                reader
                    .take()
                    .ok_or_else(|| io::Error::other("input can't be reopened"))
            },
            writer,
        )
    }

    /// A connection that calls `source` for a fresh reader after each read
    /// error, backing off between attempts.
    pub fn with_source<F>(name: impl Into<String>, user: User, source: F, writer: W) -> Self
    where
        F: FnMut() -> io::Result<R> + Send + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        Self {
            name: name.into(),
            user,
            source: Mutex::new(Box::new(source)),
            writer: Mutex::new(writer),
            retry: RetryConfig::default(),
            stop_tx,
            stop_rx,
        }
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The user every message is attributed to.
    pub fn user(&self) -> &User {
        &self.user
    }

    fn spawn_reader(&self) -> ConnectionResult<Receiver<ReadEvent>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let opened = {
            let mut source = self.source.lock();
            (*source)()
        };
        match opened {
            Ok(reader) => {
                thread::Builder::new()
                    .name(format!("{}-reader", self.name))
                    .spawn(move || read_lines(reader, tx))?;
            }
            Err(e) => {
                let _ = tx.send(ReadEvent::Failed(e));
            }
        }
        Ok(rx)
    }

    fn pump(
        &self,
        lines: &Receiver<ReadEvent>,
        events: &EventSender,
        reply: &Arc<dyn Connection>,
        backoff: &mut Backoff,
    ) -> Pumped {
        loop {
            select! {
                recv(self.stop_rx) -> _ => return Pumped::Stopped,
                recv(lines) -> read => match read {
                    Ok(ReadEvent::Line(line)) => {
                        backoff.reset();
                        let text = line.trim();
                        if !text.is_empty() {
                            trace!(connection = %self.name, len = text.len(), "Received line");
                            let message = Message::new(self.user.clone(), text)
                                .with_reply_connection(Arc::clone(reply));
                            if events.emit(message).is_err() {
                                debug!(connection = %self.name, "Event queue closed");
                                return Pumped::Stopped;
                            }
                        }
                    }
                    Ok(ReadEvent::Failed(e)) => return Pumped::Failed(e),
                    Ok(ReadEvent::Eof) | Err(_) => return Pumped::Eof,
                },
            }
        }
    }
}

fn read_lines<R: BufRead>(mut reader: R, tx: Sender<ReadEvent>) {
    loop {
        let mut buf = Vec::new();
        let event = match reader.read_until(b'\n', &mut buf) {
            Ok(0) => ReadEvent::Eof,
            Ok(_) => ReadEvent::Line(decode_line(buf)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => ReadEvent::Failed(e),
        };
        let last = !matches!(event, ReadEvent::Line(_));
        if tx.send(event).is_err() || last {
            return;
        }
    }
}

/// Invalid UTF-8 is replaced rather than failing the read.
fn decode_line(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap_or_else(|e| {
        warn!(error = %e.utf8_error(), "Input line is not valid UTF-8");
        String::from_utf8_lossy(e.as_bytes()).into_owned()
    })
}

impl<R, W> Connection for LineConnection<R, W>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(self: Arc<Self>, events: EventSender) -> ConnectionResult<()> {
        let reply: Arc<dyn Connection> = self.clone();
        let mut backoff = Backoff::new(self.retry.clone());

        loop {
            let lines = self.spawn_reader()?;
            match self.pump(&lines, &events, &reply, &mut backoff) {
                Pumped::Stopped => return Ok(()),
                Pumped::Eof => {
                    info!(connection = %self.name, "Input closed");
                    return Ok(());
                }
                Pumped::Failed(e) => {
                    let Some(delay) = backoff.next_delay() else {
                        error!(connection = %self.name, error = %e, "Max retries reached, giving up");
                        return Err(ConnectionError::from(e));
                    };
                    warn!(
                        connection = %self.name,
                        error = %e,
                        attempt = backoff.retry_count(),
                        delay = ?delay,
                        "Read failed, reopening"
                    );
                    select! {
                        recv(self.stop_rx) -> _ => return Ok(()),
                        default(delay) => {}
                    }
                }
            }
        }
    }

    fn shutdown(&self) {
        let _ = self.stop_tx.try_send(());
    }

    fn say(&self, text: &str) -> ConnectionResult<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{text}")?;
        writer.flush()?;
        Ok(())
    }
}

/// A console connection: reads standard input, writes standard output.
pub type StdioConnection = LineConnection<BufReader<Stdin>, Stdout>;

impl LineConnection<BufReader<Stdin>, Stdout> {
    /// Attributes console input to `user`.
    pub fn stdio(user: User) -> Self {
        Self::new("stdio", user, BufReader::new(io::stdin()), io::stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impbot_core::{EventReceiver, event_queue};
    use std::io::{Cursor, Read};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Blocks every read until the test ends.
    struct Blocking(Receiver<()>);

    impl Read for Blocking {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    /// Always fails.
    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    fn drain(queue: &EventReceiver) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(event) = queue.recv_timeout(Duration::from_millis(10)) {
            let message = event.downcast_ref::<Message>().unwrap();
            messages.push(Message::new(message.user.clone(), message.text.clone()));
        }
        messages
    }

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_lines_become_messages() {
        let (events, queue) = event_queue();
        let conn = Arc::new(LineConnection::new(
            "test",
            User::new("console", "alice"),
            Cursor::new("!hello\n\n  spaced out  \n"),
            SharedBuf::default(),
        ));

        conn.clone().run(events).unwrap();

        let texts: Vec<_> = drain(&queue).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["!hello", "spaced out"]);
    }

    #[test]
    fn test_invalid_utf8_line_is_kept() {
        let (events, queue) = event_queue();
        let conn = Arc::new(LineConnection::new(
            "test",
            User::new("console", "alice"),
            Cursor::new(b"\xff\xfe\nhello\n".to_vec()),
            SharedBuf::default(),
        ));

        conn.clone().run(events).unwrap();

        let texts: Vec<_> = drain(&queue).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["\u{fffd}\u{fffd}", "hello"]);
    }

    #[test]
    fn test_messages_reply_through_connection() {
        let (events, queue) = event_queue();
        let out = SharedBuf::default();
        let conn = Arc::new(LineConnection::new(
            "test",
            User::new("console", "alice"),
            Cursor::new("hi\n"),
            out.clone(),
        ));
        conn.clone().run(events).unwrap();

        let event = queue.recv_timeout(Duration::from_millis(100)).unwrap();
        let message = event.downcast_ref::<Message>().unwrap();
        assert_eq!(message.user.name(), "alice");
        message
            .reply_connection
            .as_ref()
            .unwrap()
            .say("Hello, world!")
            .unwrap();
        assert_eq!(out.text(), "Hello, world!\n");
    }

    #[test]
    fn test_shutdown_interrupts_blocked_read() {
        let (events, _queue) = event_queue();
        let (_hold, release) = crossbeam_channel::bounded::<()>(0);
        let conn = Arc::new(LineConnection::new(
            "test",
            User::new("console", "alice"),
            BufReader::new(Blocking(release)),
            SharedBuf::default(),
        ));

        let runner = {
            let conn = conn.clone();
            thread::spawn(move || conn.run(events))
        };
        thread::sleep(Duration::from_millis(20));
        conn.shutdown();
        assert!(runner.join().unwrap().is_ok());
    }

    #[test]
    fn test_read_errors_are_retried() {
        let (events, queue) = event_queue();
        let mut attempts = 0;
        let conn = Arc::new(
            LineConnection::with_source(
                "test",
                User::new("console", "alice"),
                move || -> io::Result<Box<dyn BufRead + Send>> {
                    attempts += 1;
                    if attempts < 3 {
                        Ok(Box::new(BufReader::new(Broken)))
                    } else {
                        Ok(Box::new(Cursor::new("back\n")))
                    }
                },
                SharedBuf::default(),
            )
            .retry(fast_retry(3)),
        );

        conn.clone().run(events).unwrap();

        let texts: Vec<_> = drain(&queue).into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["back"]);
    }

    #[test]
    fn test_retries_exhausted() {
        let (events, _queue) = event_queue();
        let conn = Arc::new(
            LineConnection::with_source(
                "test",
                User::new("console", "alice"),
                || Ok(BufReader::new(Broken)),
                SharedBuf::default(),
            )
            .retry(fast_retry(2)),
        );

        let err = conn.clone().run(events).unwrap_err();
        assert!(matches!(err, ConnectionError::Io(_)));
    }

    #[test]
    fn test_closed_queue_stops_quietly() {
        let (events, queue) = event_queue();
        drop(queue);
        let conn = Arc::new(LineConnection::new(
            "test",
            User::new("console", "alice"),
            Cursor::new("one\ntwo\n"),
            SharedBuf::default(),
        ));
        assert!(conn.clone().run(events).is_ok());
    }
}
