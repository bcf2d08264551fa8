use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};

/// Failures of the command line tool itself.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub(crate) enum Error {
    #[error("cannot read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file `{}`", path.display())]
    #[diagnostic(help("Each kernel needs a `command` array and a `done` string containing `{{marker}}`"))]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid target format `{0}`")]
    #[diagnostic(help("The target format must start with a letter, e.g. `html` or `latex+raw_tex`"))]
    TargetFormat(String),

    #[error("invalid timeout `{0}`")]
    #[diagnostic(help("The timeout is a positive number of seconds"))]
    Timeout(f64),

    #[error("invalid pandoc JSON on stdin")]
    #[diagnostic(help("Use knit as a filter: `pandoc -t json doc.md | knit stitch | pandoc -f json`"))]
    Json(#[source] serde_json::Error),
}

/// Option syntax errors shown with the offending options line.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("{message}")]
#[diagnostic()]
pub(crate) struct RichError {
    message: String,

    #[help]
    advice: Option<String>,

    #[source_code]
    src: NamedSource<String>,

    #[label("{position_advice}")]
    span: SourceSpan,
    position_advice: String,
}

/// Any other library error, with its advice as help.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("{message}")]
pub(crate) struct PlainError {
    message: String,

    #[help]
    advice: Option<String>,
}

pub(crate) fn parser_report(error: &knit_parser::Error, origin: &str) -> miette::Report {
    let advice = error.advice().map(ToString::to_string);
    if let knit_parser::Error::InvalidOptionSyntax { options, column } = error {
        let offset = column.saturating_sub(1).min(options.len());
        let length = usize::from(offset < options.len());
        return miette::Report::new(RichError {
            message: error.to_string(),
            advice,
            src: NamedSource::new(origin, options.clone()),
            span: SourceSpan::new(offset.into(), length),
            position_advice: format!("unexpected input at column {column}"),
        });
    }
    miette::Report::new(PlainError {
        message: error.to_string(),
        advice,
    })
}

pub(crate) fn stitch_report(error: &knit_stitch::Error) -> miette::Report {
    miette::Report::new(PlainError {
        message: error.to_string(),
        advice: error.advice().map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_syntax_has_label() {
        let error = knit_parser::Error::InvalidOptionSyntax {
            options: "r, =".to_string(),
            column: 4,
        };
        let report = parser_report(&error, "doc.md");
        assert!(report.labels().is_some_and(|mut labels| labels.next().is_some()));
        assert!(report.help().is_some());
    }

    #[test]
    fn test_interrupted_reports_cause_advice() {
        let error = knit_stitch::Error::Interrupted {
            completed: vec![],
            cause: Box::new(knit_stitch::Error::Session("gone".to_string())),
        };
        let report = stitch_report(&error);
        assert!(report.to_string().starts_with("stitching stopped after 0 block(s)"));
    }
}
