//! Sessions backed by an interpreter subprocess.
//!
//! Source is written to the interpreter's stdin followed by the kernel's
//! `done` snippet, which prints a unique marker. Output lines arrive on
//! reader threads; the marker line ends the request.
use std::{
    collections::VecDeque,
    io::{BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread,
    time::Duration,
};

use knit_stitch::{Error, Message, MessageKind, RequestId, Session, SessionFactory};

use crate::config::{Config, KernelConfig, MARKER_PLACEHOLDER};

#[derive(Debug)]
enum Line {
    Stdout(String),
    Stderr(String),
}

/// Starts one [`ProcessSession`] per configured kernel.
#[derive(Debug)]
pub(crate) struct ProcessFactory {
    config: Config,
}

impl ProcessFactory {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl SessionFactory for ProcessFactory {
    fn start(&mut self, kernel: &str) -> Result<Box<dyn Session>, Error> {
        let config = self.config.kernel(kernel).ok_or_else(|| {
            Error::Session(format!("no command configured for kernel `{kernel}`"))
        })?;
        Ok(Box::new(ProcessSession::spawn(kernel, config)?))
    }
}

struct Request {
    id: RequestId,
    marker: String,
}

/// Output lines of the interpreter, turned into messages in arrival order.
struct Transcript {
    lines: Receiver<Line>,
    /// First line of another stream, seen while merging the previous one.
    lookahead: Option<Line>,
    current: Option<Request>,
}

impl Transcript {
    fn new(lines: Receiver<Line>) -> Self {
        Self {
            lines,
            lookahead: None,
            current: None,
        }
    }

    fn begin(&mut self, request: Request) {
        self.current = Some(request);
    }

    fn next(&mut self, timeout: Duration) -> Result<Option<Message>, RecvTimeoutError> {
        let line = match self.lookahead.take() {
            Some(line) => line,
            None => match self.lines.recv_timeout(timeout) {
                Ok(line) => line,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(error @ RecvTimeoutError::Disconnected) => return Err(error),
            },
        };
        Ok(Some(self.coalesce(line)))
    }

    fn request_id(&self) -> RequestId {
        self.current
            .as_ref()
            .map(|request| request.id.clone())
            .unwrap_or_default()
    }

    fn is_marker(&self, text: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|request| text.trim_end() == request.marker)
    }

    /// Turn a line into a message, merging directly following lines of the
    /// same stream that are already waiting.
    fn coalesce(&mut self, line: Line) -> Message {
        let id = self.request_id();
        if let Line::Stdout(text) = &line
            && self.is_marker(text)
        {
            self.current = None;
            return Message::new(id, MessageKind::StatusIdle);
        }
        let (mut text, stdout) = match line {
            Line::Stdout(text) => (text, true),
            Line::Stderr(text) => (text, false),
        };
        text.push('\n');
        loop {
            match self.lines.try_recv() {
                Ok(Line::Stdout(next)) if stdout && !self.is_marker(&next) => {
                    text.push_str(&next);
                    text.push('\n');
                }
                Ok(Line::Stderr(next)) if !stdout => {
                    text.push_str(&next);
                    text.push('\n');
                }
                Ok(other) => {
                    self.lookahead = Some(other);
                    break;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        let kind = if stdout {
            MessageKind::Stdout(text)
        } else {
            MessageKind::Stderr(text)
        };
        Message::new(id, kind)
    }
}

pub(crate) struct ProcessSession {
    kernel: String,
    done: String,
    child: Child,
    stdin: ChildStdin,
    transcript: Transcript,
    pending: VecDeque<Message>,
    execution_count: u32,
}

impl ProcessSession {
    #[tracing::instrument(skip(config), fields(command = ?config.command))]
    pub(crate) fn spawn(kernel: &str, config: &KernelConfig) -> Result<Self, Error> {
        let (program, arguments) = config
            .command
            .split_first()
            .ok_or_else(|| Error::Session(format!("empty command for kernel `{kernel}`")))?;
        let mut child = Command::new(program)
            .args(arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| Error::Session(format!("cannot start `{program}`: {error}")))?;

        let missing = || Error::Session(format!("no pipes to `{program}`"));
        let stdin = child.stdin.take().ok_or_else(missing)?;
        let stdout = child.stdout.take().ok_or_else(missing)?;
        let stderr = child.stderr.take().ok_or_else(missing)?;

        let (sender, lines) = mpsc::channel();
        forward(stdout, sender.clone(), Line::Stdout);
        forward(stderr, sender, Line::Stderr);

        Ok(Self {
            kernel: kernel.to_string(),
            done: config.done.clone(),
            child,
            stdin,
            transcript: Transcript::new(lines),
            pending: VecDeque::new(),
            execution_count: 0,
        })
    }
}

impl Session for ProcessSession {
    fn submit(&mut self, source: &str) -> Result<RequestId, Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let marker = format!("__knit_done_{}__", id.replace('-', ""));
        let done = self.done.replace(MARKER_PLACEHOLDER, &marker);

        let mut input = source.trim_end_matches('\n').to_string();
        input.push('\n');
        input.push_str(&done);
        input.push('\n');
        self.stdin.write_all(input.as_bytes())?;
        self.stdin.flush()?;

        self.execution_count += 1;
        self.pending.push_back(Message::new(id.as_str(), MessageKind::StatusBusy));
        self.pending.push_back(Message::new(
            id.as_str(),
            MessageKind::ExecuteInput {
                execution_count: Some(self.execution_count),
            },
        ));
        tracing::trace!(kernel = %self.kernel, %id, "submitted");
        self.transcript.begin(Request {
            id: id.clone(),
            marker,
        });
        Ok(id)
    }

    fn receive_message(&mut self, timeout: Duration) -> Result<Option<Message>, Error> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }
        self.transcript
            .next(timeout)
            .map_err(|_| Error::Session(format!("kernel `{}` exited", self.kernel)))
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if let Err(error) = self.child.kill() {
            tracing::debug!(kernel = %self.kernel, %error, "kernel already stopped");
        }
        if let Err(error) = self.child.wait() {
            tracing::warn!(kernel = %self.kernel, %error, "failed to reap kernel");
        }
    }
}

fn forward<R>(stream: R, sender: Sender<Line>, wrap: fn(String) -> Line)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if sender.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}
