//! YAML front matter, read from the document itself or from a side-car file.
use serde_yaml::{Mapping, Value};

use crate::{Error, cells::CellMarker};

const COMMENTS_MAP_KEY: &str = "comments-map";
const COMMENTS_EXT_KEY: &str = "knitty-comments-ext";

/// Find the first `---` delimited YAML block and return its body.
///
/// The block opens with a line holding exactly `---` and closes with a line
/// holding `---` or `...`.
#[must_use]
pub fn front_matter(text: &str) -> Option<&str> {
    let mut offset = 0;
    let lines: Vec<(usize, &str)> = text
        .split_inclusive('\n')
        .map(|line| {
            let start = offset;
            offset += line.len();
            (start, line)
        })
        .collect();

    lines
        .iter()
        .enumerate()
        .filter(|(_, (_, line))| *line == "---\n")
        .find_map(|(index, (start, line))| {
            let body_start = start + line.len();
            lines
                .iter()
                .skip(index + 2)
                .find(|(_, line)| is_closing(line))
                .and_then(|(end, _)| text.get(body_start..*end))
        })
}

fn is_closing(line: &str) -> bool {
    matches!(line.strip_suffix('\n').unwrap_or(line), "---" | "...")
}

/// Parse a YAML document, anything but a mapping yields an empty mapping.
///
/// # Errors
///
/// Returns [`Error::InvalidMetadata`] when the text is not valid YAML.
pub fn load(yaml: &str) -> Result<Mapping, Error> {
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(mapping) => Ok(mapping),
        other => {
            tracing::debug!(?other, "metadata is not a mapping, ignoring it");
            Ok(Mapping::new())
        }
    }
}

/// Collect front matter from the document and the side-car text, the side-car
/// wins on conflicting keys.
///
/// # Errors
///
/// Returns [`Error::InvalidMetadata`] when either block is not valid YAML.
pub fn collect(source: &str, side_car: Option<&str>) -> Result<Mapping, Error> {
    let mut metadata = match front_matter(source) {
        Some(yaml) => load(yaml)?,
        None => Mapping::new(),
    };
    if let Some(side_car) = side_car {
        let side_car = front_matter(side_car).unwrap_or(side_car);
        for (key, value) in load(side_car)? {
            metadata.insert(key, value);
        }
    }
    Ok(metadata)
}

/// Comment markers declared through `comments-map`, if any.
///
/// `knitty-comments-ext` picks the entry, defaulting to `language`.
///
/// # Errors
///
/// Returns [`Error::InvalidCommentMarkers`] when the selected entry is not a
/// non-empty list of strings holding a comment token and begin/end pairs.
pub(crate) fn comment_markers(
    metadata: &Mapping,
    language: &str,
) -> Result<Option<CellMarker>, Error> {
    let Some(map) = metadata.get(COMMENTS_MAP_KEY) else {
        return Ok(None);
    };
    let extension = metadata
        .get(COMMENTS_EXT_KEY)
        .and_then(Value::as_str)
        .unwrap_or(language);
    let Some(entry) = map.get(extension) else {
        tracing::debug!(extension, "no comment markers declared for extension");
        return Ok(None);
    };
    let invalid = |reason: &str| Error::InvalidCommentMarkers {
        language: extension.to_string(),
        reason: reason.to_string(),
    };
    let entries = entry
        .as_sequence()
        .ok_or_else(|| invalid("expected a list"))?
        .iter()
        .map(|value| match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(_) | Value::Bool(_) | Value::Null
            | Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
                Err(invalid("markers must be strings"))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    CellMarker::from_entries(&entries)
        .map(Some)
        .ok_or_else(|| invalid("expected a comment token followed by begin/end pairs"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cells::BlockComment;

    #[test]
    fn test_front_matter() {
        let text = "intro\n---\ntitle: x\nlang: r\n...\nbody\n";
        assert_eq!(front_matter(text), Some("title: x\nlang: r\n"));
        assert_eq!(front_matter("---\na: 1\n---"), Some("a: 1\n"));
        assert_eq!(front_matter("---\n---\n"), None);
        assert_eq!(front_matter("no yaml here\n"), None);
    }

    #[test]
    fn test_load_non_mapping() {
        assert_eq!(load("- a\n- b\n").unwrap(), Mapping::new());
        assert_eq!(load("").unwrap(), Mapping::new());
        assert!(matches!(load("a: [1"), Err(Error::InvalidMetadata(_))));
    }

    #[test]
    fn test_collect_side_car_wins() {
        let metadata = collect("---\na: 1\nb: 2\n---\n", Some("b: 3\n")).unwrap();
        assert_eq!(metadata.get("a"), Some(&Value::from(1)));
        assert_eq!(metadata.get("b"), Some(&Value::from(3)));
    }

    #[test]
    fn test_comment_markers() {
        let metadata = load("comments-map:\n  js: ['//', '/*', '*/']\n").unwrap();
        assert_eq!(
            comment_markers(&metadata, "js").unwrap(),
            Some(CellMarker::Paired {
                comment: "//".to_string(),
                pairs: vec![BlockComment {
                    begin: "/*".to_string(),
                    end: "*/".to_string(),
                }],
            })
        );
        assert_eq!(comment_markers(&metadata, "py").unwrap(), None);
    }

    #[test]
    fn test_comment_markers_extension_override() {
        let metadata =
            load("knitty-comments-ext: r\ncomments-map:\n  r: ['#']\n").unwrap();
        assert_eq!(
            comment_markers(&metadata, "py").unwrap(),
            Some(CellMarker::SingleLine {
                comment: "#".to_string()
            })
        );
    }

    #[test]
    fn test_comment_markers_invalid() {
        let metadata = load("comments-map:\n  js: ['//', '/*']\n").unwrap();
        assert!(matches!(
            comment_markers(&metadata, "js"),
            Err(Error::InvalidCommentMarkers { .. })
        ));
        let metadata = load("comments-map:\n  js: '//'\n").unwrap();
        assert!(comment_markers(&metadata, "js").is_err());
    }
}
