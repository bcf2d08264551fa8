use std::path::{Path, PathBuf};

use knit_parser::{ChunkSpec, Options, ParsedOptions, preprocess};
use proptest::prelude::*;

type Error = Box<dyn std::error::Error>;

fn options_for(path: &Path) -> Options {
    match path.extension().and_then(|s| s.to_str()) {
        Some("md") | None => Options::default(),
        Some(extension) => Options::builder().with_language(extension).build(),
    }
}

/// Preprocesses every source fixture and compares with the expected markdown.
#[rstest::rstest]
#[tracing_test::traced_test]
fn test_fixtures(#[files("tests/fixtures/source/*")] path: PathBuf) -> Result<(), Error> {
    let file_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or("Invalid fixture file name")?;
    let expected_path = Path::new("tests")
        .join("fixtures")
        .join("expected")
        .join(file_name)
        .with_extension("md");

    let source = std::fs::read_to_string(&path)?;
    let expected = std::fs::read_to_string(&expected_path)?;
    let actual = preprocess(&source, &options_for(&path))?;

    pretty_assertions::assert_eq!(
        expected,
        actual,
        "preprocess output mismatch for fixture: {file_name}",
    );
    Ok(())
}

/// Preprocessing the output again changes nothing.
#[rstest::rstest]
fn test_fixtures_are_stable(#[files("tests/fixtures/source/*")] path: PathBuf) -> Result<(), Error> {
    let source = std::fs::read_to_string(&path)?;
    let once = preprocess(&source, &options_for(&path))?;
    let twice = preprocess(&once, &Options::default())?;
    pretty_assertions::assert_eq!(once, twice);
    Ok(())
}

/// A cell script and the same document written by hand as markdown end up
/// identical.
#[rstest::rstest]
fn test_cells_match_handwritten_markdown(
    #[files("tests/fixtures/equivalent/*.md")] path: PathBuf,
) -> Result<(), Error> {
    let file_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or("Invalid fixture file name")?;
    let cells_path = std::fs::read_dir(Path::new("tests").join("fixtures").join("source"))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|candidate| {
            candidate.file_stem().and_then(|s| s.to_str()) == Some(file_name)
                && candidate.extension().and_then(|s| s.to_str()) != Some("md")
        })
        .ok_or("No cell script for handwritten fixture")?;

    let handwritten = preprocess(&std::fs::read_to_string(&path)?, &options_for(&cells_path))?;
    let cells = preprocess(
        &std::fs::read_to_string(&cells_path)?,
        &options_for(&cells_path),
    )?;
    pretty_assertions::assert_eq!(handwritten, cells);
    Ok(())
}

#[test]
fn test_malformed_options_fail_the_document() {
    let source = "fine\n\n```{r, fig.cap=}\nx\n```\n";
    let result = preprocess(source, &Options::default());
    assert!(matches!(
        result,
        Err(knit_parser::Error::InvalidOptionSyntax { .. })
    ));
}

/// Reads the attributes of the first fence back the way pandoc hands them to
/// the stitcher: positional words as classes, keywords as key/value pairs.
fn first_fence_spec(markdown: &str) -> Result<ChunkSpec, Error> {
    let attributes = markdown
        .lines()
        .find_map(|line| line.strip_prefix("```{")?.strip_suffix('}'))
        .ok_or("No braced fence in output")?;
    let parsed = ParsedOptions::parse(attributes)?;
    Ok(ChunkSpec::from_attributes(&parsed.args, &parsed.kwargs))
}

#[rstest::rstest]
#[case::rmarkdown("```{r, fig, chunk=none}\nx <- 1\n```\n", None)]
#[case::decorator("@{r, fig, chunk=None}\n```\nx <- 1\n```\n", None)]
#[case::named("```{r, fig, chunk=setup}\nx <- 1\n```\n", Some("setup"))]
#[case::positional("```{r, fig, echo=FALSE}\nx <- 1\n```\n", Some("fig"))]
fn test_chunk_name_reaches_stitcher(
    #[case] source: &str,
    #[case] expected: Option<&str>,
) -> Result<(), Error> {
    let output = preprocess(source, &Options::default())?;
    let spec = first_fence_spec(&output)?;
    pretty_assertions::assert_eq!(spec.chunk_name.as_deref(), expected);
    pretty_assertions::assert_eq!(spec.language.as_deref(), Some("r"));
    Ok(())
}

fn option_item() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,6}",
        "[a-z][a-z.]{0,4}[a-z]=[a-z0-9]{1,4}",
        "[a-z]{1,5}=\"[a-z ,]{0,6}\"",
    ]
}

proptest! {
    #[test]
    fn test_braced_fences_are_idempotent(
        language in "[a-z][a-z0-9]{0,5}",
        items in proptest::collection::vec(option_item(), 1..4),
        body in "[a-z =()]{0,12}",
    ) {
        let source = format!("```{{{language}, {}}}\n{body}\n```\n", items.join(", "));
        let options = Options::default();
        let once = preprocess(&source, &options);
        prop_assume!(once.is_ok());
        let once = once.unwrap_or_default();
        let twice = preprocess(&once, &options).unwrap_or_default();
        prop_assert_eq!(once, twice);
    }
}
