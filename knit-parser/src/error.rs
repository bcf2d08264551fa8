#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid option syntax at column {column}: {options:?}")]
    InvalidOptionSyntax { options: String, column: usize },

    #[error("Invalid id name: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid class name: {0}")]
    InvalidClassName(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(#[from] serde_yaml::Error),

    #[error("Invalid comment markers for `{language}`: {reason}")]
    InvalidCommentMarkers { language: String, reason: String },
}

impl Error {
    pub(crate) fn option_syntax(options: &str, error: &peg::error::ParseError<peg::str::LineCol>) -> Self {
        Self::InvalidOptionSyntax {
            options: options.to_string(),
            column: error.location.column,
        }
    }

    /// Get advice for this error if available.
    /// Returns helpful information for resolving the error.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::InvalidOptionSyntax { .. } => Some(
                "Chunk options are comma or space separated: a language, an optional chunk name, then key=value pairs (e.g. `{python, setup, echo=false}`)",
            ),
            Self::InvalidIdentifier(..) | Self::InvalidClassName(..) => Some(
                "Names must start with a letter or underscore and may contain letters, digits, `_`, `-` and inner `.`",
            ),
            Self::InvalidCommentMarkers { .. } => Some(
                "The comments-map entry is a list: the line comment first, then begin/end pairs of block comments",
            ),
            Self::InvalidMetadata(..) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_invalid_option_syntax_display() {
        let error = Error::InvalidOptionSyntax {
            options: "r, =".to_string(),
            column: 4,
        };
        assert_eq!(
            format!("{error}"),
            "Invalid option syntax at column 4: \"r, =\""
        );
    }

    #[test]
    fn test_error_advice() {
        assert!(Error::InvalidClassName("1a".to_string()).advice().is_some());
        let error = Error::InvalidCommentMarkers {
            language: "py".to_string(),
            reason: "empty list".to_string(),
        };
        assert_eq!(
            format!("{error}"),
            "Invalid comment markers for `py`: empty list"
        );
        assert!(error.advice().is_some());
    }
}
