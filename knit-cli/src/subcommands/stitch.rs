use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Args as ClapArgs;
use knit_stitch::{Document, Stitch, StitchOptions};

use crate::{
    config::Config,
    error::{self, Error},
    pandoc::PandocReader,
    process_session::ProcessFactory,
};

/// Execute code chunks as a pandoc JSON filter
///
/// Reads a pandoc JSON document on stdin and writes the stitched document to
/// stdout. INPUT and OUTPUT are only used to name the resource directory.
#[derive(ClapArgs, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Args {
    /// Source document the JSON was produced from
    pub input: Option<PathBuf>,

    /// Reader format for markup produced by chunks
    #[arg(short = 'f', long = "from", short_alias = 'r', alias = "read", default_value = "markdown")]
    pub from: String,

    /// Output format pandoc writes afterwards
    #[arg(short = 't', long = "to", short_alias = 'w', alias = "write")]
    pub to: Option<String>,

    /// Output file pandoc writes afterwards
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Embed images in the document instead of writing files
    #[arg(long)]
    pub self_contained: bool,

    /// Read chunk markup as standalone documents
    #[arg(long)]
    pub standalone: bool,

    /// Name of the resource directory (`NAME_files`)
    #[arg(long)]
    pub dir_name: Option<String>,

    /// Seconds to wait for each kernel message
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Mark `input=true` code blocks as notebook code cells (the class is the
    /// `codecell-match-class` metadata, `in` by default)
    #[arg(long)]
    pub to_ipynb: bool,

    /// Kernel configuration, `knit.toml` when present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extra arguments for the reader
    #[arg(last = true)]
    pub pandoc_args: Vec<String>,
}

pub(crate) fn run(args: &Args) -> miette::Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|source| Error::Read {
            path: PathBuf::from("<stdin>"),
            source,
        })?;
    let document: Document = serde_json::from_str(&input).map_err(Error::Json)?;

    let options = options(args)?;
    tracing::debug!(name = %options.name, target = %options.target_format, "stitching");
    let config = Config::load(args.config.as_deref())?;
    let reader = PandocReader::new(|name| which::which(name).ok());
    let mut stitch = Stitch::new(options, ProcessFactory::new(config), reader);
    let result = stitch.stitch(document);
    stitch.close();

    let mut stitched = result.map_err(|e| {
        if let knit_stitch::Error::Interrupted { completed, .. } = &e {
            tracing::warn!(blocks = completed.len(), "discarding partially stitched document");
        }
        error::stitch_report(&e)
    })?;
    if args.to_ipynb {
        knit_stitch::mark_code_cells(&mut stitched);
    }
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &stitched).map_err(Error::Json)?;
    stdout.flush().map_err(|source| Error::Write {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    Ok(())
}

fn options(args: &Args) -> Result<StitchOptions, Error> {
    let name = match (&args.dir_name, &args.output, &args.input) {
        (Some(name), _, _) => name.clone(),
        (None, Some(output), _) => hyphenized_basename(output),
        (None, None, Some(input)) => format!("{}-{}", hyphenized_basename(input), dir_ext(args.to.as_deref())?),
        (None, None, None) => format!("stdout-{}", dir_ext(args.to.as_deref())?),
    };
    let target = match (&args.to, &args.output) {
        (Some(to), _) => dir_ext(Some(to.as_str()))?,
        (None, Some(output)) => output
            .extension()
            .and_then(|extension| extension.to_str())
            .filter(|extension| !extension.is_empty())
            .unwrap_or("html")
            .to_string(),
        (None, None) => "html".to_string(),
    };

    let mut extra_args = args.pandoc_args.clone();
    if args.standalone {
        extra_args.push("--standalone".to_string());
    }
    if args.self_contained {
        extra_args.push("--self-contained".to_string());
    }

    let mut builder = StitchOptions::builder()
        .with_name(name)
        .with_target_format(target)
        .with_reader(args.from.clone(), extra_args)
        .with_self_contained(args.self_contained)
        .with_standalone(args.standalone);
    if let Some(seconds) = args.timeout {
        let timeout = Duration::try_from_secs_f64(seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .ok_or_else(|| Error::Timeout(seconds))?;
        builder = builder.with_timeout(timeout);
    }
    Ok(builder.build())
}

/// File name with every `.` replaced by `-`: `report.html` is `report-html`.
fn hyphenized_basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().replace('.', "-"))
        .unwrap_or_default()
}

/// The leading letters of a pandoc format, with markdown dialects as `md`.
fn dir_ext(to: Option<&str>) -> Result<String, Error> {
    let Some(to) = to else {
        return Ok("html".to_string());
    };
    let word: String = to.chars().take_while(char::is_ascii_alphabetic).collect();
    match word.as_str() {
        "" => Err(Error::TargetFormat(to.to_string())),
        "markdown" | "commonmark" | "gfm" => Ok("md".to_string()),
        _ => Ok(word),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args() -> Args {
        Args {
            input: None,
            from: "markdown".to_string(),
            to: None,
            output: None,
            self_contained: false,
            standalone: false,
            dir_name: None,
            timeout: None,
            to_ipynb: false,
            config: None,
            pandoc_args: vec![],
        }
    }

    #[rstest::rstest]
    #[case(None, "html")]
    #[case(Some("latex"), "latex")]
    #[case(Some("gfm+smart"), "md")]
    #[case(Some("markdown_strict"), "md")]
    #[case(Some("html5"), "html")]
    fn test_dir_ext(#[case] to: Option<&str>, #[case] expected: &str) {
        assert_eq!(dir_ext(to).unwrap(), expected);
    }

    #[test]
    fn test_dir_ext_rejects_non_letters() {
        assert!(matches!(dir_ext(Some("5html")), Err(Error::TargetFormat(_))));
    }

    #[test]
    fn test_name_from_output() {
        let mut arguments = args();
        arguments.output = Some(PathBuf::from("out/report.tex"));
        arguments.input = Some(PathBuf::from("report.md"));
        let options = options(&arguments).unwrap();
        assert_eq!(options.name, "report-tex");
        assert_eq!(options.target_format, "tex");
    }

    #[test]
    fn test_name_from_input() {
        let mut arguments = args();
        arguments.input = Some(PathBuf::from("notes.v2.md"));
        arguments.to = Some("beamer".to_string());
        let options = options(&arguments).unwrap();
        assert_eq!(options.name, "notes-v2-md-beamer");
        assert!(options.targets_latex());
    }

    #[test]
    fn test_name_from_stdout() {
        let options = options(&args()).unwrap();
        assert_eq!(options.name, "stdout-html");
        assert_eq!(options.target_format, "html");
    }

    #[test]
    fn test_explicit_dir_name_and_flags() {
        let mut arguments = args();
        arguments.dir_name = Some("assets".to_string());
        arguments.standalone = true;
        arguments.pandoc_args = vec!["--wrap=none".to_string()];
        arguments.timeout = Some(1.5);
        let options = options(&arguments).unwrap();
        assert_eq!(options.name, "assets");
        assert_eq!(
            options.reader.extra_args,
            vec!["--wrap=none".to_string(), "--standalone".to_string()]
        );
        assert!(!options.defaults.self_contained);
        assert_eq!(options.defaults.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_bad_timeout() {
        let mut arguments = args();
        arguments.timeout = Some(-1.0);
        assert!(matches!(options(&arguments), Err(Error::Timeout(_))));
    }
}
