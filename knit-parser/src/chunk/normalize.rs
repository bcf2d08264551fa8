use std::fmt;

use crate::{
    Error,
    grammar::chunk_grammar,
    chunk::{CHUNK_KEY, NO_CHUNK_NAME, Token, TokenKind, is_identifier, tokenize, unquote},
};

/// How the chunk name was given through the `chunk=` keyword.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ChunkName {
    /// No `chunk=` keyword: the second positional argument names the chunk.
    #[default]
    Unset,
    Named(String),
    /// `chunk=none`
    Cleared,
}

/// Options sorted into positional and keyword arguments.
///
/// Keyword values keep their quotes, pandoc unquotes them when it reads the
/// canonical attribute line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
    pub chunk: ChunkName,
}

impl ParsedOptions {
    /// Parse and normalize an options line.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidOptionSyntax`] when the line does not tokenize.
    /// * [`Error::InvalidIdentifier`] when `id=` holds something other than a name.
    /// * [`Error::InvalidClassName`] when a positional argument, a `class=` word
    ///   or the chunk name is not a name.
    pub fn parse(options: &str) -> Result<Self, Error> {
        Self::from_tokens(&tokenize(options)?)
    }

    /// Normalize already lexed tokens.
    ///
    /// # Errors
    ///
    /// See [`ParsedOptions::parse`].
    pub fn from_tokens(tokens: &[Token]) -> Result<Self, Error> {
        let mut args: Vec<String> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Arg)
            .map(|token| {
                token
                    .text
                    .strip_prefix('.')
                    .unwrap_or(&token.text)
                    .to_string()
            })
            .collect();

        let mut kwargs = Vec::new();
        let mut chunk = ChunkName::Unset;
        for token in tokens.iter().filter(|token| token.kind == TokenKind::Kwarg) {
            let (key, value) = chunk_grammar::kwarg(&token.text)
                .map_err(|e| Error::option_syntax(&token.text, &e))?;
            match key {
                CHUNK_KEY if chunk == ChunkName::Unset => {
                    let name = unquote(value);
                    chunk = if name.eq_ignore_ascii_case(NO_CHUNK_NAME) {
                        ChunkName::Cleared
                    } else {
                        ChunkName::Named(name.to_string())
                    };
                }
                "class" => {
                    args.extend(unquote(value).split_whitespace().map(ToString::to_string));
                }
                "id" if !is_identifier(value) => {
                    return Err(Error::InvalidIdentifier(value.to_string()));
                }
                _ => kwargs.push((key.to_string(), value.to_string())),
            }
        }

        if let ChunkName::Named(name) = &chunk {
            if args.is_empty() {
                args.push(name.clone());
            } else {
                args.insert(1, name.clone());
            }
        }

        if let Some(invalid) = args.iter().find(|arg| !is_identifier(arg)) {
            return Err(Error::InvalidClassName(invalid.clone()));
        }

        Ok(Self {
            args,
            kwargs,
            chunk,
        })
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    #[must_use]
    pub fn chunk_name(&self) -> Option<&str> {
        match &self.chunk {
            ChunkName::Named(name) => Some(name),
            ChunkName::Cleared => None,
            ChunkName::Unset => self.args.get(1).map(String::as_str),
        }
    }
}

impl fmt::Display for ParsedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args.iter().map(|arg| format!(".{arg}"));
        // Without it the second class would name the chunk once read back.
        let cleared =
            (self.chunk == ChunkName::Cleared).then(|| format!("{CHUNK_KEY}={NO_CHUNK_NAME}"));
        let kwargs = self.kwargs.iter().map(|(key, value)| format!("{key}={value}"));
        let canonical = args.chain(cleared).chain(kwargs).collect::<Vec<_>>().join(" ");
        f.write_str(&canonical)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_chunk_keyword_is_spliced() {
        let parsed = ParsedOptions::parse("r, fig, chunk=setup, echo=False").unwrap();
        assert_eq!(parsed.args, vec!["r", "setup", "fig"]);
        assert_eq!(parsed.kwargs, vec![("echo".to_string(), "False".to_string())]);
        assert_eq!(parsed.chunk_name(), Some("setup"));
        assert_eq!(parsed.to_string(), ".r .setup .fig echo=False");
    }

    #[test]
    fn test_chunk_keyword_quoted() {
        let parsed = ParsedOptions::parse("python, chunk='plot'").unwrap();
        assert_eq!(parsed.to_string(), ".python .plot");
    }

    #[test]
    fn test_chunk_none_clears_name() {
        let parsed = ParsedOptions::parse("r, chunk=None").unwrap();
        assert_eq!(parsed.chunk, ChunkName::Cleared);
        assert_eq!(parsed.chunk_name(), None);
        assert_eq!(parsed.to_string(), ".r chunk=none");
    }

    #[test]
    fn test_chunk_none_survives_reparse() {
        let parsed = ParsedOptions::parse("r, fig, chunk=none, echo=False").unwrap();
        assert_eq!(parsed.to_string(), ".r .fig chunk=none echo=False");
        let again = ParsedOptions::parse(&parsed.to_string()).unwrap();
        assert_eq!(again, parsed);
    }

    #[test]
    fn test_chunk_keyword_without_language() {
        let parsed = ParsedOptions::parse("chunk=a").unwrap();
        assert_eq!(parsed.args, vec!["a"]);
    }

    #[test]
    fn test_second_chunk_keyword_is_kept() {
        let parsed = ParsedOptions::parse("r, chunk=a, chunk=b").unwrap();
        assert_eq!(parsed.to_string(), ".r .a chunk=b");
    }

    #[test]
    fn test_second_positional_names_chunk() {
        let parsed = ParsedOptions::parse("r, setup").unwrap();
        assert_eq!(parsed.chunk, ChunkName::Unset);
        assert_eq!(parsed.chunk_name(), Some("setup"));
        assert_eq!(parsed.language(), Some("r"));
    }

    #[test]
    fn test_class_keyword_expands() {
        let parsed = ParsedOptions::parse(r#"python, class="a b", echo=True"#).unwrap();
        assert_eq!(parsed.to_string(), ".python .a .b echo=True");
        let parsed = ParsedOptions::parse("python, class=c").unwrap();
        assert_eq!(parsed.to_string(), ".python .c");
    }

    #[test]
    fn test_class_keyword_invalid_word() {
        let err = ParsedOptions::parse(r#"python, class="a 1b""#).unwrap_err();
        assert!(matches!(err, Error::InvalidClassName(name) if name == "1b"));
    }

    #[test]
    fn test_id_validation() {
        let parsed = ParsedOptions::parse("python, id=fig-1").unwrap();
        assert_eq!(parsed.to_string(), ".python id=fig-1");
        let err = ParsedOptions::parse("python, id='1a'").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(id) if id == "'1a'"));
    }

    #[test]
    fn test_quotes_survive_normalization() {
        let parsed = ParsedOptions::parse(r#"r, fig.cap = "A, Caption""#).unwrap();
        assert_eq!(parsed.to_string(), r#".r fig.cap="A, Caption""#);
    }

    #[test]
    fn test_canonical_form_is_stable() {
        let once = ParsedOptions::parse("r, setup, class='x y', chunk=c, k='v w'")
            .unwrap()
            .to_string();
        let twice = ParsedOptions::parse(&once).unwrap().to_string();
        assert_eq!(once, ".r .c .setup .x .y k='v w'");
        assert_eq!(once, twice);
    }
}
