/// Language assumed when neither the caller nor a chunk names one.
pub const DEFAULT_LANGUAGE: &str = "py";

#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Options {
    /// Language of chunks that do not declare one. In cell mode this is also
    /// the extension looked up in `comments-map`.
    pub language: Option<String>,
    /// Side-car YAML metadata, merged over the document's own front matter.
    pub metadata: Option<String>,
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use knit_parser::Options;
    ///
    /// let options = Options::builder()
    ///     .with_language("r")
    ///     .with_metadata("comments-map:\n  r: ['#']\n")
    ///     .build();
    /// assert_eq!(options.language(), "r");
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Create a new `Options` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default language, `py` if none was configured or it is empty.
    #[must_use]
    pub fn language(&self) -> &str {
        self.language
            .as_deref()
            .filter(|language| !language.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// Builder for `Options`.
///
/// Create an `OptionsBuilder` using `Options::builder()`.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    language: Option<String>,
    metadata: Option<String>,
}

impl OptionsBuilder {
    /// Set the default chunk language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set side-car YAML metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        Options {
            language: self.language,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language() {
        assert_eq!(Options::new().language(), DEFAULT_LANGUAGE);
        assert_eq!(Options::builder().with_language("").build().language(), "py");
        assert_eq!(Options::builder().with_language("jl").build().language(), "jl");
    }
}
