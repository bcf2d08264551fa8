//! Cell mode: scripts split into cells by `# %%` style comment markers.
//!
//! The whole document is a program in some language. Each marker line opens a
//! new cell, its optional `{...}` options become the chunk options and the
//! cell body becomes the fenced code. Cells whose language is `md` are prose:
//! their body is emitted as is, usually hidden from the interpreter inside a
//! block comment (`''' ... '''`) that the transducer strips.
use crate::{
    Error,
    chunk::{leading_language, preprocess_options},
    grammar::chunk_grammar,
};

/// Language name marking a prose cell.
pub const MARKDOWN_LANGUAGE: &str = "md";

/// Longest comment token accepted on the first line.
const MAX_COMMENT_LEN: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockComment {
    pub begin: String,
    pub end: String,
}

/// How cell separators are spelled in a particular language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellMarker {
    /// `# %%` only.
    SingleLine { comment: String },
    /// `# %%` where cell bodies may also be wrapped in block comments.
    Paired {
        comment: String,
        pairs: Vec<BlockComment>,
    },
}

impl CellMarker {
    /// Build markers from a `[comment, begin1, end1, begin2, end2, ...]` list.
    ///
    /// Returns `None` for an empty list or an unmatched begin marker.
    #[must_use]
    pub fn from_entries(entries: &[String]) -> Option<Self> {
        let (comment, rest) = entries.split_first()?;
        if rest.is_empty() {
            return Some(Self::SingleLine {
                comment: comment.clone(),
            });
        }
        let chunks = rest.chunks_exact(2);
        if !chunks.remainder().is_empty() {
            return None;
        }
        let pairs = chunks
            .filter_map(|pair| match pair {
                [begin, end] => Some(BlockComment {
                    begin: begin.clone(),
                    end: end.clone(),
                }),
                _ => None,
            })
            .collect();
        Some(Self::Paired {
            comment: comment.clone(),
            pairs,
        })
    }

    /// Detect cell mode from the first line of a document.
    ///
    /// The line must be `COMMENT %%` (the comment token is one to three
    /// non-blank characters), optionally followed by `{options}`, a
    /// `BEGIN %%% END` block comment declaration and free text.
    #[must_use]
    pub fn sniff(source: &str) -> Option<Self> {
        let (first_line, _) = source.split_once('\n')?;
        let first_line = first_line.strip_suffix('\r').unwrap_or(first_line);
        let comment_end: Vec<usize> = first_line
            .char_indices()
            .take_while(|(_, c)| !c.is_whitespace())
            .take(MAX_COMMENT_LEN)
            .map(|(index, c)| index + c.len_utf8())
            .collect();

        comment_end.iter().rev().find_map(|end| {
            let (comment, rest) = first_line.split_at_checked(*end)?;
            let (_, pair) = chunk_grammar::first_cell_marker(rest).ok()?;
            let comment = comment.to_string();
            Some(match pair {
                Some((begin, end)) => Self::Paired {
                    comment,
                    pairs: vec![BlockComment {
                        begin: begin.to_string(),
                        end: end.to_string(),
                    }],
                },
                None => Self::SingleLine { comment },
            })
        })
    }

    #[must_use]
    pub fn comment(&self) -> &str {
        match self {
            Self::SingleLine { comment } | Self::Paired { comment, .. } => comment,
        }
    }

    fn pairs(&self) -> &[BlockComment] {
        match self {
            Self::SingleLine { .. } => &[],
            Self::Paired { pairs, .. } => pairs,
        }
    }

    /// Options of a marker line: `Some(None)` for a bare marker,
    /// `Some(Some(options))` when braces follow, `None` if the line is code.
    fn parse_line<'a>(&self, line: &'a str) -> Option<Option<&'a str>> {
        let rest = line.trim_start().strip_prefix(self.comment())?;
        chunk_grammar::cell_marker(rest).ok()
    }
}

#[derive(Debug)]
enum CellKind<'a> {
    Prose,
    Code { options: Option<&'a str> },
}

#[derive(Debug)]
struct Cell<'a> {
    kind: CellKind<'a>,
    body: Vec<&'a str>,
}

impl Cell<'_> {
    fn is_prose(&self, default_language: &str) -> Result<bool, Error> {
        match self.kind {
            CellKind::Prose => Ok(true),
            CellKind::Code { .. } => Ok(self.language(default_language)? == MARKDOWN_LANGUAGE),
        }
    }

    fn language<'l>(&'l self, default_language: &'l str) -> Result<&'l str, Error> {
        match self.kind {
            CellKind::Code {
                options: Some(options),
            } => Ok(leading_language(options)?.unwrap_or(default_language)),
            CellKind::Code { options: None } | CellKind::Prose => Ok(default_language),
        }
    }

    fn options(&self, default_language: &str) -> Result<String, Error> {
        let options = match self.kind {
            CellKind::Code {
                options: Some(options),
            } => match leading_language(options)? {
                Some(_) => options.to_string(),
                None => format!("{default_language}, {options}"),
            },
            CellKind::Code { options: None } | CellKind::Prose => default_language.to_string(),
        };
        preprocess_options(&options)
    }
}

/// Rewrites a cell-marked script into fenced markdown.
#[derive(Debug)]
pub(crate) struct CellTransducer<'a> {
    language: &'a str,
    marker: CellMarker,
}

impl<'a> CellTransducer<'a> {
    pub(crate) fn new(language: &'a str, marker: CellMarker) -> Self {
        Self { language, marker }
    }

    #[tracing::instrument(skip(source), fields(comment = self.marker.comment()))]
    pub(crate) fn transduce(&self, source: &str) -> Result<String, Error> {
        let source = source.replace("\r\n", "\n");
        let mut output = String::with_capacity(source.len());

        for cell in self.split(&source) {
            let mut body = cell.body.as_slice();
            if !self.marker.pairs().is_empty() && matches!(cell.kind, CellKind::Code { .. }) {
                let mut opened = None;
                if let Some((first, rest)) = body.split_first()
                    && let Some(pair) = self.opening(first)
                {
                    body = rest;
                    opened = Some(pair);
                }
                body = trim_trailing_blank(body);
                if let Some(pair) = opened
                    && let Some((last, rest)) = body.split_last()
                    && *last == pair.end
                {
                    body = trim_trailing_blank(rest);
                }
            } else {
                body = trim_trailing_blank(body);
            }

            if body.iter().all(|line| line.trim().is_empty()) {
                tracing::debug!(?cell.kind, "dropping empty cell");
                continue;
            }

            let prose = cell.is_prose(self.language)?;
            if !output.is_empty() {
                output.push('\n');
            }
            if !prose {
                output.push_str("```{");
                output.push_str(&cell.options(self.language)?);
                output.push_str("}\n");
            }
            for line in body {
                output.push_str(line);
                output.push('\n');
            }
            if !prose {
                output.push_str("```\n");
            }
        }
        Ok(output)
    }

    fn split<'s>(&self, source: &'s str) -> Vec<Cell<'s>> {
        let mut cells = vec![Cell {
            kind: CellKind::Prose,
            body: Vec::new(),
        }];
        for line in source.split('\n') {
            if let Some(options) = self.marker.parse_line(line) {
                cells.push(Cell {
                    kind: CellKind::Code { options },
                    body: Vec::new(),
                });
            } else if let Some(cell) = cells.last_mut() {
                cell.body.push(line);
            }
        }
        cells
    }

    /// The block comment a cell body opens with, if any.
    fn opening(&self, line: &str) -> Option<&BlockComment> {
        self.marker.pairs().iter().find(|pair| pair.begin == line)
    }
}

fn trim_trailing_blank<'a, 's>(mut lines: &'a [&'s str]) -> &'a [&'s str] {
    while let Some((last, rest)) = lines.split_last()
        && last.trim().is_empty()
    {
        lines = rest;
    }
    lines
}
