/// Prefix echoed source with an interpreter prompt.
///
/// With an explicit `prompt` every line gets it. Otherwise the IPython style
/// `In [N]: ` prompt is used, with `...:` continuation markers aligned under
/// its colon. Without an execution count there is nothing to show and the
/// source is returned unchanged.
#[must_use]
pub fn format_input_prompt(source: &str, prompt: Option<&str>, execution_count: Option<u32>) -> String {
    match (prompt, execution_count) {
        (Some(prompt), _) => source
            .split('\n')
            .map(|line| format!("{prompt}{line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        (None, Some(count)) => ipython_prompt(source, count),
        (None, None) => source.to_string(),
    }
}

fn ipython_prompt(source: &str, count: u32) -> String {
    let start = format!("In [{count}]: ");
    let continuation = format!("{}...:", " ".repeat(start.len().saturating_sub(5)));
    source
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                format!("{start}{line}")
            } else if line.is_empty() {
                format!("{continuation}{line}")
            } else {
                format!("{continuation} {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_ipython_prompt() {
        assert_eq!(
            format_input_prompt("def f():\n\n    return 1", None, Some(12)),
            "In [12]: def f():\n    ...:\n    ...:     return 1"
        );
    }

    #[test]
    fn test_explicit_prompt() {
        assert_eq!(
            format_input_prompt("a <- 1\nb <- 2", Some("> "), Some(1)),
            "> a <- 1\n> b <- 2"
        );
        assert_eq!(format_input_prompt("x", Some(">>> "), None), ">>> x");
    }

    #[test]
    fn test_trailing_newline_keeps_its_line() {
        assert_eq!(format_input_prompt("a\n", None, Some(3)), "In [3]: a\n   ...:");
        assert_eq!(format_input_prompt("a\n", Some("> "), None), "> a\n> ");
    }

    #[test]
    fn test_no_execution_count() {
        assert_eq!(format_input_prompt("x = 1\ny", None, None), "x = 1\ny");
    }
}
