//! The boundary to interpreter sessions.
//!
//! A session accepts source code and answers with a stream of messages, each
//! tagged with the id of the request that caused it. How messages travel
//! (a kernel protocol, a subprocess, a test script) is up to the implementor.
use std::{collections::BTreeMap, time::Duration};

use rustc_hash::FxHashMap;

use crate::Error;

pub type RequestId = String;

/// Output payloads keyed by mimetype. Binary payloads are base64 text.
pub type MimeBundle = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Stdout(String),
    Stderr(String),
    ExecuteInput {
        execution_count: Option<u32>,
    },
    ExecuteResult {
        data: MimeBundle,
        execution_count: Option<u32>,
    },
    DisplayData(MimeBundle),
    Error {
        traceback: Vec<String>,
    },
    ClearOutput,
    StatusBusy,
    StatusIdle,
    /// Widget traffic (`comm_open`, `comm_msg`, ...), never rendered.
    Comm(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub parent_id: RequestId,
    pub kind: MessageKind,
}

impl Message {
    #[must_use]
    pub fn new(parent_id: impl Into<RequestId>, kind: MessageKind) -> Self {
        Self {
            parent_id: parent_id.into(),
            kind,
        }
    }

    #[must_use]
    pub fn execution_count(&self) -> Option<u32> {
        match &self.kind {
            MessageKind::ExecuteInput { execution_count }
            | MessageKind::ExecuteResult {
                execution_count, ..
            } => *execution_count,
            MessageKind::Stdout(_)
            | MessageKind::Stderr(_)
            | MessageKind::DisplayData(_)
            | MessageKind::Error { .. }
            | MessageKind::ClearOutput
            | MessageKind::StatusBusy
            | MessageKind::StatusIdle
            | MessageKind::Comm(_) => None,
        }
    }
}

/// A running interpreter.
pub trait Session {
    /// Submit source for execution.
    ///
    /// # Errors
    ///
    /// Fails when the interpreter cannot accept the request.
    fn submit(&mut self, source: &str) -> Result<RequestId, Error>;

    /// The next message, or `Ok(None)` if nothing arrived within `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the interpreter went away.
    fn receive_message(&mut self, timeout: Duration) -> Result<Option<Message>, Error>;
}

/// Starts sessions by kernel name.
pub trait SessionFactory {
    /// # Errors
    ///
    /// Fails when no session can be started for `kernel`.
    fn start(&mut self, kernel: &str) -> Result<Box<dyn Session>, Error>;
}

/// One session per kernel name, started on first use and kept for the rest of
/// the conversion.
pub struct SessionRegistry {
    factory: Box<dyn SessionFactory>,
    sessions: FxHashMap<String, Box<dyn Session>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("kernels", &self.sessions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new(factory: Box<dyn SessionFactory>) -> Self {
        Self {
            factory,
            sessions: FxHashMap::default(),
        }
    }

    /// The session for `kernel`, started if it is not running yet.
    ///
    /// # Errors
    ///
    /// Propagates the factory's error when the session cannot be started.
    pub fn get_or_start(&mut self, kernel: &str) -> Result<&mut dyn Session, Error> {
        if !self.sessions.contains_key(kernel) {
            tracing::info!(kernel, "starting session");
            let session = self.factory.start(kernel)?;
            self.sessions.insert(kernel.to_string(), session);
        }
        self.sessions
            .get_mut(kernel)
            .map(|session| &mut **session as &mut dyn Session)
            .ok_or_else(|| Error::Session(format!("session for `{kernel}` disappeared")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Stop every session.
    pub fn shutdown(&mut self) {
        for (kernel, _) in self.sessions.drain() {
            tracing::debug!(%kernel, "stopping session");
        }
    }
}
