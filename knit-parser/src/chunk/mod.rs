//! Chunk option lines: `r, setup, fig.cap="A, Caption", echo=False`.
//!
//! An option line is lexed into [`Token`]s, sorted into positional and keyword
//! arguments ([`ParsedOptions`]) and emitted in the canonical pandoc attribute
//! form (`.r .setup fig.cap="A, Caption" echo=False`).
use std::fmt;

use crate::{Error, grammar::chunk_grammar};

mod normalize;
mod spec;

pub use normalize::{ChunkName, ParsedOptions};
pub use spec::ChunkSpec;

pub(crate) const CHUNK_KEY: &str = "chunk";
pub(crate) const NO_CHUNK_NAME: &str = "none";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `key`
    Arg,
    /// `key=value`, the value optionally quoted
    Kwarg,
    /// `,` or a run of spaces
    Delimiter,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    #[must_use]
    pub fn arg(text: &str) -> Self {
        Self {
            kind: TokenKind::Arg,
            text: text.to_string(),
        }
    }

    #[must_use]
    pub fn kwarg(text: &str) -> Self {
        Self {
            kind: TokenKind::Kwarg,
            text: text.to_string(),
        }
    }

    #[must_use]
    pub fn delimiter(text: &str) -> Self {
        Self {
            kind: TokenKind::Delimiter,
            text: text.to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.text)
    }
}

/// Lex an options line into tokens.
///
/// # Errors
///
/// Returns [`Error::InvalidOptionSyntax`] when part of the line is neither an
/// argument, a keyword argument nor a delimiter.
#[tracing::instrument(level = "trace")]
pub fn tokenize(options: &str) -> Result<Vec<Token>, Error> {
    chunk_grammar::tokens(options).map_err(|e| Error::option_syntax(options, &e))
}

/// Tokenize, normalize and render an options line in canonical form.
///
/// # Errors
///
/// Propagates tokenizer and validation errors (see [`ParsedOptions::parse`]).
pub fn preprocess_options(options: &str) -> Result<String, Error> {
    Ok(ParsedOptions::parse(options)?.to_string())
}

/// The positional argument an option list starts with, if it starts with one.
pub(crate) fn leading_language(options: &str) -> Result<Option<&str>, Error> {
    let tokens = tokenize(options)?;
    Ok(tokens
        .first()
        .filter(|token| token.kind == TokenKind::Arg)
        .and_then(|token| options.get(..token.text.len())))
}

pub(crate) fn is_identifier(name: &str) -> bool {
    chunk_grammar::identifier(name).is_ok()
}

/// Strip one layer of matching double quotes, or failing that single quotes.
pub(crate) fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| {
            value
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        })
        .unwrap_or(value)
}
