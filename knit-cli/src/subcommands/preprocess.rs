use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use clap::Args as ClapArgs;
use knit_parser::{MARKDOWN_LANGUAGE, Options};

use crate::error::{self, Error};

/// Rewrite chunk headers (`@{r, setup}`, "```{python, echo=False}", `# %%`
/// cells) into pandoc fenced code attributes
#[derive(ClapArgs, Debug)]
pub(crate) struct Args {
    /// Input file, stdin when omitted
    pub input: Option<PathBuf>,

    /// Default chunk language, the input file extension when omitted
    #[arg(short, long = "lang")]
    pub language: Option<String>,

    /// YAML metadata file merged over the document's front matter
    #[arg(long)]
    pub yaml: Option<PathBuf>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(args: &Args) -> miette::Result<()> {
    let source = match &args.input {
        Some(path) => read(path)?,
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|source| Error::Read {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            source
        }
    };

    let options = options(args)?;
    let origin = args
        .input
        .as_ref()
        .map_or_else(|| "<stdin>".to_string(), |path| path.display().to_string());
    let output =
        knit_parser::preprocess(&source, &options).map_err(|e| error::parser_report(&e, &origin))?;

    match &args.output {
        Some(path) => std::fs::write(path, output).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(output.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|source| Error::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
    }
    Ok(())
}

fn options(args: &Args) -> Result<Options, Error> {
    let mut builder = Options::builder();
    if let Some(language) = args
        .language
        .clone()
        .or_else(|| args.input.as_deref().and_then(language_of))
    {
        builder = builder.with_language(language);
    }
    if let Some(path) = &args.yaml {
        builder = builder.with_metadata(read(path)?);
    }
    Ok(builder.build())
}

/// The extension of a script, `None` for markdown documents.
fn language_of(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    if extension == MARKDOWN_LANGUAGE || extension == "markdown" {
        return None;
    }
    Some(extension.to_string())
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}
