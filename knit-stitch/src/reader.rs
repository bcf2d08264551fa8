use crate::{Error, ast::Block};

/// Turns text in some markup format into document blocks.
///
/// Used for outputs that are themselves markup: `results=pandoc` streams and
/// `text/markdown` payloads.
pub trait Reader {
    /// Parse `source` written in `format`.
    ///
    /// # Errors
    ///
    /// Fails when the reader cannot run or cannot parse the source.
    fn read_blocks(&self, source: &str, format: &str, extra_args: &[String]) -> Result<Vec<Block>, Error>;
}

/// A reader for conversions that never need one: every call fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReader;

impl Reader for NoReader {
    fn read_blocks(&self, _source: &str, format: &str, _extra_args: &[String]) -> Result<Vec<Block>, Error> {
        Err(Error::Reader(format!("no reader available for `{format}`")))
    }
}
