use std::time::Duration;

use crate::{
    Error,
    session::{Message, MessageKind, Session},
};

/// Run `source` and collect the messages it produced.
///
/// Messages are read until the session reports idle for this request.
/// Messages answering other requests and widget traffic are skipped, and a
/// clear-output request drops everything collected so far.
///
/// # Errors
///
/// Returns [`Error::ExecutionTimeout`] when no message arrives within
/// `timeout`, and propagates session failures.
#[tracing::instrument(skip(session, source), fields(lines = source.lines().count()))]
pub fn run_code(
    session: &mut dyn Session,
    kernel: &str,
    source: &str,
    timeout: Duration,
) -> Result<Vec<Message>, Error> {
    let request = session.submit(source)?;
    let mut messages = Vec::new();
    loop {
        let Some(message) = session.receive_message(timeout)? else {
            return Err(Error::ExecutionTimeout {
                kernel: kernel.to_string(),
                timeout,
            });
        };
        if message.parent_id != request {
            tracing::trace!(parent = %message.parent_id, "skipping message for another request");
            continue;
        }
        match message.kind {
            MessageKind::StatusIdle => break,
            MessageKind::StatusBusy | MessageKind::Comm(_) => {}
            MessageKind::ClearOutput => messages.clear(),
            MessageKind::Stdout(_)
            | MessageKind::Stderr(_)
            | MessageKind::ExecuteInput { .. }
            | MessageKind::ExecuteResult { .. }
            | MessageKind::DisplayData(_)
            | MessageKind::Error { .. } => messages.push(message),
        }
    }
    tracing::debug!(count = messages.len(), "collected messages");
    Ok(messages)
}

/// Execution count of the first message carrying one.
#[must_use]
pub fn execution_count(messages: &[Message]) -> Option<u32> {
    messages.iter().find_map(Message::execution_count)
}
