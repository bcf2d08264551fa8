use crate::{
    Error,
    chunk::{TokenKind, leading_language, preprocess_options, tokenize},
    grammar::chunk_grammar,
};

/// Rewrites decorated and braced fence headers into canonical fences.
///
/// Two header spellings are recognised:
///
/// * a `@{options}` line directly above a plain fence ("```" or "```lang"),
/// * a braced fence ("```{options}") whose options hold a comma or a keyword
///   argument. A single bare word in braces is left alone, pandoc already
///   understands it.
///
/// Everything else is copied through unchanged.
#[derive(Debug)]
pub(crate) struct DialectMatcher<'a> {
    language: &'a str,
}

impl<'a> DialectMatcher<'a> {
    pub(crate) fn new(language: &'a str) -> Self {
        Self { language }
    }

    #[tracing::instrument(skip(source))]
    pub(crate) fn rewrite(&self, source: &str) -> Result<String, Error> {
        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        let mut output = String::with_capacity(source.len());
        let mut index = 0;

        while let Some(line) = lines.get(index) {
            if let Ok(options) = chunk_grammar::decorator(content(line))
                && let Some(next) = lines.get(index + 1)
                && let Ok(fence_language) = chunk_grammar::plain_fence(content(next))
            {
                tracing::trace!(options, ?fence_language, "decorated fence");
                self.push_fence(&mut output, options, fence_language, ending(next))?;
                index += 2;
                continue;
            }
            if let Ok(options) = chunk_grammar::braced_fence(content(line))
                && is_knit_style(options)?
            {
                tracing::trace!(options, "braced fence");
                self.push_fence(&mut output, options, None, ending(line))?;
                index += 1;
                continue;
            }
            output.push_str(line);
            index += 1;
        }
        Ok(output)
    }

    fn push_fence(
        &self,
        output: &mut String,
        options: &str,
        fence_language: Option<&str>,
        ending: &str,
    ) -> Result<(), Error> {
        let canonical = if leading_language(options)?.is_some() {
            preprocess_options(options)?
        } else {
            let language = fence_language.unwrap_or(self.language);
            preprocess_options(&format!("{language}, {options}"))?
        };
        output.push_str("```{");
        output.push_str(&canonical);
        output.push('}');
        output.push_str(ending);
        Ok(())
    }
}

fn content(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .unwrap_or(line)
}

/// The terminator of `line`, so rewritten fences keep the document's line
/// endings.
fn ending(line: &str) -> &str {
    line.get(content(line).len()..).unwrap_or_default()
}

fn is_knit_style(options: &str) -> Result<bool, Error> {
    Ok(tokenize(options)?
        .iter()
        .any(|token| matches!(token.kind, TokenKind::Delimiter | TokenKind::Kwarg)))
}
