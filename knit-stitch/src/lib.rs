//! Executes code chunks of a pandoc JSON document.
//!
//! The document is read as a pandoc AST. Each code block whose language maps
//! to a kernel is sent to a [`Session`] for that kernel, and the messages it
//! answers with are turned back into blocks: plain output, raw HTML or LaTeX,
//! images, or blocks parsed by a [`Reader`]. Everything else in the document
//! is written back unchanged.
//!
//! Sessions and readers are traits so the engine can be driven by real
//! interpreters and converters, or by scripted ones in tests.
mod ast;
mod engine;
mod error;
mod execute;
mod lang;
mod meta;
mod notebook;
mod options;
mod output;
mod prompt;
mod reader;
mod session;

pub use ast::{Attr, Block, Document, Inline};
pub use engine::Stitch;
pub use error::Error;
pub use execute::{execution_count, run_code};
pub use lang::LangMapper;
pub use meta::{MetaValue, decode_map};
pub use notebook::{CODECELL_MATCH_CLASS_KEY, DEFAULT_CODECELL_MATCH_CLASS, mark_code_cells};
pub use options::{
    ChunkOptions, DEFAULT_TIMEOUT, DocumentOptions, ErrorMode, FigureOptions, ReaderArgs,
    ResultsMode, StitchOptions, StitchOptionsBuilder,
};
pub use prompt::format_input_prompt;
pub use reader::{NoReader, Reader};
pub use session::{Message, MessageKind, MimeBundle, RequestId, Session, SessionFactory, SessionRegistry};
