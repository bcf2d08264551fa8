//! Text-level preprocessing of literate documents.
//!
//! Chunk headers written in the light-weight option syntax
//! (`{python, setup, echo=False}`) are rewritten into the fenced attribute form
//! pandoc reads natively (`{.python .setup echo=False}`). Two document shapes
//! are handled:
//!
//! * markdown with `@{options}` decorators or "```{options}" fences,
//! * scripts split into cells by comment markers (`# %%`), turned into
//!   markdown with one fenced chunk per code cell.
//!
//! ```
//! use knit_parser::{Options, preprocess};
//!
//! let text = "@{r, setup}\n```\nx <- 1\n```\n";
//! let output = preprocess(text, &Options::default())?;
//! assert_eq!(output, "```{.r .setup}\nx <- 1\n```\n");
//! # Ok::<(), knit_parser::Error>(())
//! ```
mod cells;
mod chunk;
mod dialect;
mod error;
mod grammar;
pub mod metadata;
mod options;

pub use cells::{BlockComment, CellMarker, MARKDOWN_LANGUAGE};
pub use chunk::{
    ChunkName, ChunkSpec, ParsedOptions, Token, TokenKind, preprocess_options, tokenize,
};
pub use error::Error;
pub use options::{DEFAULT_LANGUAGE, Options, OptionsBuilder};

use cells::CellTransducer;
use dialect::DialectMatcher;

/// Rewrite a document's chunk headers into canonical pandoc fences.
///
/// Cell mode is chosen when the metadata declares comment markers for the
/// language, or when the first line is a cell marker. Otherwise the markdown
/// fence dialects are rewritten in place.
///
/// # Errors
///
/// Any malformed options line fails the whole document, see [`Error`].
#[tracing::instrument(skip(source))]
pub fn preprocess(source: &str, options: &Options) -> Result<String, Error> {
    let language = options.language();
    let metadata = metadata::collect(source, options.metadata.as_deref())?;

    let marker = match metadata::comment_markers(&metadata, language)? {
        Some(marker) => Some(marker),
        None => CellMarker::sniff(source),
    };

    match marker {
        Some(marker) => {
            tracing::debug!(?marker, "cell mode");
            CellTransducer::new(language, marker).transduce(source)
        }
        None => DialectMatcher::new(language).rewrite(source),
    }
}
