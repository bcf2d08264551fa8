use knit_parser::ChunkSpec;

use crate::{
    Error,
    ast::{Attr, Block, Document},
    execute::{execution_count, run_code},
    lang::LangMapper,
    options::{ChunkOptions, DocumentOptions, ErrorMode, ResultsMode, StitchOptions},
    output::OutputResolver,
    prompt::format_input_prompt,
    reader::Reader,
    session::{Message, MessageKind, SessionFactory, SessionRegistry},
};

/// Executes the code blocks of a document and splices their output in.
///
/// Blocks run one at a time in document order. Each kernel gets one session,
/// started the first time a block needs it and kept across calls to
/// [`Stitch::stitch`] until [`Stitch::close`].
///
/// ```
/// use knit_stitch::{Document, NoReader, Session, SessionFactory, Stitch, StitchOptions};
///
/// struct NoKernels;
///
/// impl SessionFactory for NoKernels {
///     fn start(&mut self, kernel: &str) -> Result<Box<dyn Session>, knit_stitch::Error> {
///         Err(knit_stitch::Error::Session(format!("no kernel `{kernel}`")))
///     }
/// }
///
/// let document: Document = serde_json::from_str(
///     r#"{"pandoc-api-version":[1,23,1],"meta":{},"blocks":[{"t":"Para","c":[]}]}"#,
/// )?;
/// let mut stitch = Stitch::new(StitchOptions::default(), NoKernels, NoReader);
/// let stitched = stitch.stitch(document.clone())?;
/// assert_eq!(stitched, document);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Stitch {
    options: StitchOptions,
    sessions: SessionRegistry,
    reader: Box<dyn Reader>,
}

impl std::fmt::Debug for Stitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stitch")
            .field("options", &self.options)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Stitch {
    #[must_use]
    pub fn new(
        options: StitchOptions,
        factory: impl SessionFactory + 'static,
        reader: impl Reader + 'static,
    ) -> Self {
        Self {
            options,
            sessions: SessionRegistry::new(Box::new(factory)),
            reader: Box::new(reader),
        }
    }

    #[must_use]
    pub fn options(&self) -> &StitchOptions {
        &self.options
    }

    /// Number of sessions started so far.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Execute every executable code block of `document`.
    ///
    /// Non-code blocks are passed through untouched. Each executed block is
    /// followed by its output blocks, and preceded by its echoed input unless
    /// `echo` is off.
    ///
    /// # Errors
    ///
    /// Invalid metadata options are returned as is. Failures while executing
    /// blocks (timeouts, `error=raise`, unknown image types, reader or session
    /// errors) are returned as [`Error::Interrupted`] carrying the blocks
    /// finished before the failing one.
    #[tracing::instrument(skip_all, fields(blocks = document.blocks.len()))]
    pub fn stitch(&mut self, document: Document) -> Result<Document, Error> {
        let mut settings = self.options.defaults.clone();
        settings.apply_metadata(&document.meta)?;
        let languages = LangMapper::from_metadata(&document.meta);

        let Document {
            api_version,
            meta,
            blocks,
        } = document;
        let mut completed = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.into_iter().enumerate() {
            let Block::CodeBlock(attr, source) = block else {
                completed.push(block);
                continue;
            };
            if let Err(cause) = self.stitch_block(
                index,
                attr,
                source,
                &settings,
                &languages,
                &mut completed,
            ) {
                return Err(Error::Interrupted {
                    completed,
                    cause: Box::new(cause),
                });
            }
        }
        Ok(Document {
            api_version,
            meta,
            blocks: completed,
        })
    }

    fn stitch_block(
        &mut self,
        index: usize,
        attr: Attr,
        source: String,
        settings: &DocumentOptions,
        languages: &LangMapper,
        output: &mut Vec<Block>,
    ) -> Result<(), Error> {
        let spec = ChunkSpec::from_attributes(&attr.classes, &attr.attributes);
        let chunk = settings.chunk.overlay(&attr.attributes)?;
        let name = spec
            .chunk_name
            .clone()
            .unwrap_or_else(|| format!("unnamed_chunk_{index}"));
        let kernel = spec
            .language
            .as_deref()
            .filter(|_| chunk.eval)
            .and_then(|language| languages.kernel(language));

        let messages = match kernel {
            Some(kernel) => {
                tracing::debug!(chunk = %name, kernel, "executing chunk");
                let session = self.sessions.get_or_start(kernel)?;
                run_code(session, kernel, &source, settings.timeout)?
            }
            None => {
                tracing::trace!(chunk = %name, "not executing chunk");
                Vec::new()
            }
        };

        if chunk.echo {
            output.push(Self::echo(attr, source, &spec, settings, &chunk, languages, &messages));
        }
        if chunk.error == ErrorMode::Raise
            && let Some(traceback) = messages.iter().find_map(|message| {
                if let MessageKind::Error { traceback } = &message.kind {
                    Some(traceback.clone())
                } else {
                    None
                }
            })
        {
            return Err(Error::Execution {
                chunk: name,
                traceback,
            });
        }
        if messages.is_empty() || chunk.results == ResultsMode::Hide {
            return Ok(());
        }
        let resolver = OutputResolver {
            chunk_name: &name,
            options: &chunk,
            document: settings,
            stitch: &self.options,
            reader: self.reader.as_ref(),
        };
        output.extend(resolver.resolve(&messages)?);
        Ok(())
    }

    fn echo(
        mut attr: Attr,
        source: String,
        spec: &ChunkSpec,
        settings: &DocumentOptions,
        chunk: &ChunkOptions,
        languages: &LangMapper,
        messages: &[Message],
    ) -> Block {
        if let (Some(language), Some(first)) = (spec.language.as_deref(), attr.classes.first_mut()) {
            *first = languages.style(language).to_string();
        }
        let source = if settings.prompts_enabled(chunk) {
            format_input_prompt(&source, chunk.prompt.as_deref(), execution_count(messages))
        } else {
            source
        };
        Block::CodeBlock(attr, source)
    }

    /// Stop every session.
    pub fn close(&mut self) {
        self.sessions.shutdown();
    }
}

impl Drop for Stitch {
    fn drop(&mut self) {
        self.close();
    }
}
