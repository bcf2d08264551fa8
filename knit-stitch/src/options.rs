//! Execution options.
//!
//! Options come in three layers: built-in defaults, document metadata and the
//! attributes of each code block. Each layer is applied with an explicit match
//! on the key, unknown keys are left for other tools.
use std::{path::PathBuf, str::FromStr, time::Duration};

use serde_json::{Map, Value};

use crate::{
    Error,
    meta::{MetaValue, decode_map},
};

/// Seconds to wait for each kernel message.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Render the traceback as output.
    #[default]
    Continue,
    /// Stop processing the document.
    Raise,
}

impl FromStr for ErrorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Self::Continue),
            "raise" => Ok(Self::Raise),
            other => Err(Error::invalid_option("error", other)),
        }
    }
}

/// Reader format and arguments for `results=pandoc`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReaderArgs {
    pub format: Option<String>,
    pub extra_args: Vec<String>,
}

impl ReaderArgs {
    /// Split pandoc style arguments: `-f/-r/--from/--read FORMAT` (or
    /// `--from=FORMAT`) selects the format, everything else is passed on.
    #[must_use]
    pub fn parse(args: &str) -> Self {
        const FORMAT_FLAGS: [&str; 4] = ["-f", "-r", "--from", "--read"];
        let mut words = args.split_whitespace();
        let mut reader = Self::default();
        while let Some(word) = words.next() {
            if FORMAT_FLAGS.contains(&word) {
                reader.format = words.next().map(ToString::to_string);
            } else if let Some(format) = word
                .strip_prefix("--from=")
                .or_else(|| word.strip_prefix("--read="))
            {
                reader.format = Some(format.to_string());
            } else {
                reader.extra_args.push(word.to_string());
            }
        }
        reader
    }

    /// Whether `--standalone` (or `-s`) is among the extra arguments.
    #[must_use]
    pub fn standalone(&self) -> bool {
        self.extra_args
            .iter()
            .any(|arg| arg == "--standalone" || arg == "-s")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResultsMode {
    #[default]
    Default,
    Hide,
    /// Run textual output through the document reader.
    Pandoc(ReaderArgs),
}

impl FromStr for ResultsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(char::is_whitespace) {
            None if s == "default" => Ok(Self::Default),
            None if s == "hide" => Ok(Self::Hide),
            None if s == "pandoc" => Ok(Self::Pandoc(ReaderArgs::default())),
            Some(("pandoc", args)) => Ok(Self::Pandoc(ReaderArgs::parse(args))),
            _ => Err(Error::invalid_option("results", s)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FigureOptions {
    pub width: Option<String>,
    pub height: Option<String>,
    pub cap: Option<String>,
}

/// Options a code block may override.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkOptions {
    pub eval: bool,
    pub echo: bool,
    pub warning: bool,
    pub error: ErrorMode,
    pub results: ResultsMode,
    pub prompt: Option<String>,
    pub fig: FigureOptions,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            eval: true,
            echo: true,
            warning: true,
            error: ErrorMode::default(),
            results: ResultsMode::default(),
            prompt: None,
            fig: FigureOptions::default(),
        }
    }
}

impl ChunkOptions {
    /// Apply one option. Returns `Ok(false)` if `key` is not a chunk option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] when the value does not fit the key.
    pub fn set(&mut self, key: &str, value: &MetaValue) -> Result<bool, Error> {
        match key {
            "eval" => self.eval = to_bool(key, value)?,
            "echo" => self.echo = to_bool(key, value)?,
            "warning" => self.warning = to_bool(key, value)?,
            "error" => self.error = to_text(key, value)?.parse()?,
            "results" => self.results = to_text(key, value)?.parse()?,
            "prompt" => self.prompt = Some(to_text(key, value)?),
            "fig.width" => self.fig.width = Some(to_text(key, value)?),
            "fig.height" => self.fig.height = Some(to_text(key, value)?),
            "fig.cap" => self.fig.cap = Some(to_text(key, value)?),
            "fig" => {
                let MetaValue::Map(entries) = value else {
                    return Err(Error::invalid_option(key, format!("{value:?}")));
                };
                for (name, value) in entries {
                    if !self.set(&format!("fig.{name}"), value)? {
                        tracing::debug!(key = %name, "ignoring unknown figure option");
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// These options with a code block's attributes applied on top.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for a known key with a bad value.
    pub fn overlay(&self, attributes: &[(String, String)]) -> Result<Self, Error> {
        let mut options = self.clone();
        for (key, value) in attributes {
            options.set(key, &MetaValue::String(value.clone()))?;
        }
        Ok(options)
    }
}

/// Document-wide options, read from metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentOptions {
    pub title: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub self_contained: bool,
    pub standalone: bool,
    pub use_prompt: bool,
    pub timeout: Duration,
    pub chunk: ChunkOptions,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            title: None,
            date: None,
            author: None,
            self_contained: true,
            standalone: true,
            use_prompt: false,
            timeout: DEFAULT_TIMEOUT,
            chunk: ChunkOptions::default(),
        }
    }
}

impl DocumentOptions {
    /// Apply the recognised keys of a pandoc metadata map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] when a recognised key has a bad value.
    pub fn apply_metadata(&mut self, meta: &Map<String, Value>) -> Result<(), Error> {
        for (key, value) in decode_map(meta) {
            self.set(&key, &value)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &MetaValue) -> Result<(), Error> {
        match key {
            "title" => self.title = value.to_text(),
            "date" => self.date = value.to_text(),
            "author" => self.author = value.to_text(),
            "self_contained" => self.self_contained = to_bool(key, value)?,
            "standalone" => self.standalone = to_bool(key, value)?,
            "use_prompt" => self.use_prompt = to_bool(key, value)?,
            "timeout" => {
                let text = to_text(key, value)?;
                let seconds = text
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
                    .ok_or_else(|| Error::invalid_option(key, text.clone()))?;
                self.timeout = Duration::from_secs_f64(seconds);
            }
            _ => {
                if !self.chunk.set(key, value)? {
                    tracing::trace!(key, "ignoring metadata key");
                }
            }
        }
        Ok(())
    }

    /// Whether input blocks get an interpreter prompt.
    #[must_use]
    pub fn prompts_enabled(&self, chunk: &ChunkOptions) -> bool {
        self.use_prompt || chunk.prompt.is_some()
    }
}

fn to_text(key: &str, value: &MetaValue) -> Result<String, Error> {
    value
        .to_text()
        .ok_or_else(|| Error::invalid_option(key, format!("{value:?}")))
}

fn to_bool(key: &str, value: &MetaValue) -> Result<bool, Error> {
    match value {
        MetaValue::Bool(b) => Ok(*b),
        MetaValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        MetaValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        MetaValue::String(_) | MetaValue::List(_) | MetaValue::Map(_) => {
            Err(Error::invalid_option(key, format!("{value:?}")))
        }
    }
}

/// Conversion-wide settings that do not come from the document.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct StitchOptions {
    /// Base name for generated resources (`{name}_files`).
    pub name: String,
    /// Output format pandoc writes after stitching (`html`, `latex`, ...).
    pub target_format: String,
    /// Format used to read `results=pandoc` output.
    pub reader: ReaderArgs,
    /// Directory the resource directory is created in.
    pub resource_root: PathBuf,
    /// Defaults the document metadata is applied on top of.
    pub defaults: DocumentOptions,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            name: "stitch".to_string(),
            target_format: "html".to_string(),
            reader: ReaderArgs {
                format: Some("markdown".to_string()),
                extra_args: Vec::new(),
            },
            resource_root: PathBuf::from("."),
            defaults: DocumentOptions::default(),
        }
    }
}

impl StitchOptions {
    /// Create a new `StitchOptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use knit_stitch::StitchOptions;
    ///
    /// let options = StitchOptions::builder()
    ///     .with_name("report")
    ///     .with_target_format("latex")
    ///     .with_self_contained(false)
    ///     .build();
    /// assert!(options.resource_dir().ends_with("report_files"));
    /// ```
    #[must_use]
    pub fn builder() -> StitchOptionsBuilder {
        StitchOptionsBuilder::default()
    }

    /// Where image files are written when the output is not self-contained.
    #[must_use]
    pub fn resource_dir(&self) -> PathBuf {
        self.resource_root.join(format!("{}_files", self.name))
    }

    /// Whether raw LaTeX output is preferred over everything else.
    #[must_use]
    pub fn targets_latex(&self) -> bool {
        matches!(self.target_format.as_str(), "latex" | "beamer" | "pdf")
    }

    #[must_use]
    pub fn reader_format(&self) -> &str {
        self.reader.format.as_deref().unwrap_or("markdown")
    }
}

/// Builder for `StitchOptions`.
///
/// Create a `StitchOptionsBuilder` using `StitchOptions::builder()`.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct StitchOptionsBuilder {
    options: StitchOptions,
}

impl StitchOptionsBuilder {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    #[must_use]
    pub fn with_target_format(mut self, format: impl Into<String>) -> Self {
        self.options.target_format = format.into();
        self
    }

    /// Reader format and extra arguments, e.g. `markdown` and `["--standalone"]`.
    #[must_use]
    pub fn with_reader(mut self, format: impl Into<String>, extra_args: Vec<String>) -> Self {
        self.options.reader = ReaderArgs {
            format: Some(format.into()),
            extra_args,
        };
        self
    }

    #[must_use]
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.resource_root = root.into();
        self
    }

    #[must_use]
    pub fn with_self_contained(mut self, self_contained: bool) -> Self {
        self.options.defaults.self_contained = self_contained;
        self
    }

    #[must_use]
    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.options.defaults.standalone = standalone;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.defaults.timeout = timeout;
        self
    }

    /// Replace the chunk option defaults.
    #[must_use]
    pub fn with_chunk_defaults(mut self, chunk: ChunkOptions) -> Self {
        self.options.defaults.chunk = chunk;
        self
    }

    #[must_use]
    pub fn build(self) -> StitchOptions {
        self.options
    }
}
