use std::time::Duration;

use crate::ast::Block;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no reply from kernel `{kernel}` within {}s", timeout.as_secs_f64())]
    ExecutionTimeout { kernel: String, timeout: Duration },

    #[error("chunk `{chunk}` raised an error:\n{}", traceback.join("\n"))]
    Execution { chunk: String, traceback: Vec<String> },

    #[error("unknown mimetype `{mimetype}` in chunk `{chunk}`")]
    UnknownMimetype { chunk: String, mimetype: String },

    #[error("invalid value for option `{key}`: {value}")]
    InvalidOption { key: String, value: String },

    #[error("session error: {0}")]
    Session(String),

    #[error("reader error: {0}")]
    Reader(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Execution stopped part way through the document.
    #[error("stitching stopped after {} block(s): {cause}", completed.len())]
    Interrupted {
        /// Blocks finished before the failure, in document order.
        completed: Vec<Block>,
        #[source]
        cause: Box<Error>,
    },
}

impl Error {
    pub(crate) fn invalid_option(key: &str, value: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// The error that stopped execution, looking through [`Error::Interrupted`].
    #[must_use]
    pub fn cause(&self) -> &Self {
        match self {
            Self::Interrupted { cause, .. } => cause.cause(),
            other => other,
        }
    }

    /// Get advice for this error if available.
    /// Returns helpful information for resolving the error.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self.cause() {
            Self::ExecutionTimeout { .. } => {
                Some("Increase the `timeout` document option, or check that the kernel is running")
            }
            Self::Execution { .. } => Some(
                "Set `error=continue` on the chunk (or in the document metadata) to render the traceback instead of stopping",
            ),
            Self::UnknownMimetype { .. } => {
                Some("Supported images are PNG, JPEG, GIF, SVG and PDF")
            }
            Self::InvalidOption { .. } => Some(
                "Boolean options take true/false, `error` takes continue/raise and `results` takes default/hide/pandoc",
            ),
            Self::Session(_)
            | Self::Reader(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Base64(_)
            | Self::Interrupted { .. } => None,
        }
    }
}
