//! Turning collected kernel messages into document blocks.
use std::{fs, path::Path};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
    Error,
    ast::{Attr, Block, Inline},
    options::{ChunkOptions, DocumentOptions, ReaderArgs, ResultsMode, StitchOptions},
    reader::Reader,
    session::{Message, MessageKind, MimeBundle},
};

/// Preferred mimetypes, best first. Anything not listed ranks last.
const DISPLAY_PRIORITY: [&str; 9] = [
    "text/html",
    "application/pdf",
    "text/latex",
    "image/svg+xml",
    "image/png",
    "image/jpeg",
    "text/markdown",
    "text/plain",
    "application/javascript",
];

const MARKDOWN_FAMILY: [&str; 3] = ["markdown", "gfm", "commonmark"];

const NO_ARGS: &[String] = &[];

/// What a single message contributes to the document.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OutputArtifact {
    /// Shown verbatim in an output block.
    Text(String),
    RawMarkup { format: String, text: String },
    /// An image, `url` is either a `data:` URI or a path to the written file.
    Image { url: String, title: String },
    NestedBlocks(Vec<Block>),
}

pub(crate) struct OutputResolver<'a> {
    pub(crate) chunk_name: &'a str,
    pub(crate) options: &'a ChunkOptions,
    pub(crate) document: &'a DocumentOptions,
    pub(crate) stitch: &'a StitchOptions,
    pub(crate) reader: &'a dyn Reader,
}

impl OutputResolver<'_> {
    /// Blocks for all messages: streams first, then rich displays, each group
    /// in arrival order.
    #[tracing::instrument(skip_all, fields(chunk = self.chunk_name))]
    pub(crate) fn resolve(&self, messages: &[Message]) -> Result<Vec<Block>, Error> {
        let (streams, displays): (Vec<&Message>, Vec<&Message>) = messages
            .iter()
            .partition(|message| matches!(message.kind, MessageKind::Stdout(_) | MessageKind::Stderr(_)));

        let mut blocks = Vec::new();
        for message in streams.into_iter().chain(displays) {
            if let Some(artifact) = self.artifact(message)? {
                blocks.extend(self.render(artifact));
            }
        }
        Ok(blocks)
    }

    fn artifact(&self, message: &Message) -> Result<Option<OutputArtifact>, Error> {
        match &message.kind {
            MessageKind::Stdout(text) => self.text(text).map(Some),
            MessageKind::Stderr(text) if self.options.warning => {
                Ok(Some(OutputArtifact::Text(text.clone())))
            }
            MessageKind::Error { traceback } => {
                Ok(Some(OutputArtifact::Text(traceback.join("\n"))))
            }
            MessageKind::ExecuteResult { data, .. } | MessageKind::DisplayData(data) => {
                self.display(data)
            }
            MessageKind::Stderr(_)
            | MessageKind::ExecuteInput { .. }
            | MessageKind::ClearOutput
            | MessageKind::StatusBusy
            | MessageKind::StatusIdle
            | MessageKind::Comm(_) => Ok(None),
        }
    }

    /// Plain text, parsed by the reader when the chunk asks for `results=pandoc`.
    fn text(&self, text: &str) -> Result<OutputArtifact, Error> {
        match &self.options.results {
            ResultsMode::Pandoc(args) => {
                let (format, extra_args) = self.pandoc_reader(args);
                Ok(OutputArtifact::NestedBlocks(
                    self.reader.read_blocks(text, format, extra_args)?,
                ))
            }
            ResultsMode::Default | ResultsMode::Hide => Ok(OutputArtifact::Text(text.to_string())),
        }
    }

    fn display(&self, data: &MimeBundle) -> Result<Option<OutputArtifact>, Error> {
        let Some((mimetype, payload)) = self.choose(data) else {
            tracing::debug!("empty display data");
            return Ok(None);
        };
        tracing::trace!(mimetype, "rendering display data");
        let artifact = match mimetype {
            "text/plain" => self.text(payload)?,
            "text/latex" => OutputArtifact::RawMarkup {
                format: "latex".to_string(),
                text: payload.to_string(),
            },
            "text/html" => OutputArtifact::RawMarkup {
                format: "html".to_string(),
                text: payload.to_string(),
            },
            "application/javascript" => OutputArtifact::RawMarkup {
                format: "html".to_string(),
                text: format!("<script type=text/javascript>{payload}</script>"),
            },
            "text/markdown" => {
                let (format, extra_args) = self.markdown_reader();
                OutputArtifact::NestedBlocks(self.reader.read_blocks(payload, format, extra_args)?)
            }
            image if image.starts_with("image/") || image == "application/pdf" => {
                self.image(image, payload)?
            }
            _ => {
                let (format, extra_args) = self.document_reader();
                OutputArtifact::NestedBlocks(self.reader.read_blocks(payload, format, extra_args)?)
            }
        };
        Ok(Some(artifact))
    }

    fn choose<'d>(&self, data: &'d MimeBundle) -> Option<(&'d str, &'d str)> {
        if self.stitch.targets_latex()
            && let Some((mimetype, payload)) = data.get_key_value("text/latex")
        {
            return Some((mimetype.as_str(), payload.as_str()));
        }
        data.iter()
            .min_by_key(|(mimetype, _)| {
                DISPLAY_PRIORITY
                    .iter()
                    .position(|known| *known == mimetype.as_str())
                    .unwrap_or(DISPLAY_PRIORITY.len())
            })
            .map(|(mimetype, payload)| (mimetype.as_str(), payload.as_str()))
    }

    fn pandoc_reader<'r>(&'r self, args: &'r ReaderArgs) -> (&'r str, &'r [String]) {
        if *args == ReaderArgs::default() {
            self.document_reader()
        } else {
            (args.format.as_deref().unwrap_or("markdown"), &args.extra_args)
        }
    }

    fn document_reader(&self) -> (&str, &[String]) {
        (self.stitch.reader_format(), &self.stitch.reader.extra_args)
    }

    fn markdown_reader(&self) -> (&str, &[String]) {
        let chunk = match &self.options.results {
            ResultsMode::Pandoc(args) => Some(self.pandoc_reader(args)),
            ResultsMode::Default | ResultsMode::Hide => None,
        };
        chunk
            .into_iter()
            .chain(Some(self.document_reader()))
            .find(|(format, _)| is_markdown(format))
            .unwrap_or(("markdown", NO_ARGS))
    }

    fn image(&self, mimetype: &str, payload: &str) -> Result<OutputArtifact, Error> {
        if self.document.self_contained {
            let url = match mimetype {
                "image/png" | "image/jpeg" => format!("data:{mimetype};base64,{payload}"),
                "image/svg+xml" => format!("data:{mimetype};base64,{}", STANDARD.encode(payload)),
                _ => return Err(self.unknown_mimetype(mimetype)),
            };
            return Ok(OutputArtifact::Image {
                url,
                title: String::new(),
            });
        }

        let extension = match mimetype {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            "application/pdf" => "pdf",
            _ => return Err(self.unknown_mimetype(mimetype)),
        };
        let directory = self.stitch.resource_dir();
        fs::create_dir_all(&directory)?;
        let path = directory.join(format!("{}.{extension}", self.chunk_name));
        if extension == "svg" {
            fs::write(&path, payload)?;
        } else {
            fs::write(&path, decode_base64(payload)?)?;
        }
        tracing::debug!(path = %path.display(), "wrote image");
        Ok(OutputArtifact::Image {
            url: path_to_url(&path),
            title: format!("fig: {}", self.chunk_name),
        })
    }

    fn unknown_mimetype(&self, mimetype: &str) -> Error {
        Error::UnknownMimetype {
            chunk: self.chunk_name.to_string(),
            mimetype: mimetype.to_string(),
        }
    }

    fn render(&self, artifact: OutputArtifact) -> Vec<Block> {
        match artifact {
            OutputArtifact::Text(text) => vec![Block::plain_output(text)],
            OutputArtifact::RawMarkup { format, text } => vec![Block::RawBlock(format, text)],
            OutputArtifact::NestedBlocks(blocks) => blocks,
            OutputArtifact::Image { url, title } => {
                let fig = &self.options.fig;
                let attributes = [("width", &fig.width), ("height", &fig.height)]
                    .into_iter()
                    .filter_map(|(key, value)| value.clone().map(|value| (key.to_string(), value)))
                    .collect();
                let attr = Attr {
                    identifier: self.chunk_name.to_string(),
                    classes: Vec::new(),
                    attributes,
                };
                let caption = vec![Inline::Str(fig.cap.clone().unwrap_or_default())];
                vec![Block::Para(vec![Inline::Image(attr, caption, (url, title))])]
            }
        }
    }
}

fn is_markdown(format: &str) -> bool {
    MARKDOWN_FAMILY.iter().any(|family| format.starts_with(family))
}

/// Kernels wrap base64 payloads at 76 columns.
fn decode_base64(payload: &str) -> Result<Vec<u8>, Error> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

fn path_to_url(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
