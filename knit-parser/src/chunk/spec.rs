use rustc_hash::FxHashMap;

use crate::chunk::{CHUNK_KEY, NO_CHUNK_NAME, ParsedOptions, unquote};

/// What a chunk declares about itself once its options are resolved.
///
/// `classes` holds every positional argument once, the language first, in the
/// order they were written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkSpec {
    pub language: Option<String>,
    pub chunk_name: Option<String>,
    pub classes: Vec<String>,
    pub attributes: FxHashMap<String, String>,
}

impl ChunkSpec {
    /// Build a spec from pandoc code block attributes (classes and key/value
    /// pairs), as found after the document has been read into a tree.
    ///
    /// A `chunk` attribute wins over the second class, `chunk=none` leaves the
    /// chunk unnamed.
    #[must_use]
    pub fn from_attributes(classes: &[String], attributes: &[(String, String)]) -> Self {
        let chunk_name = match attributes.iter().find(|(key, _)| key == CHUNK_KEY) {
            Some((_, name)) if name.eq_ignore_ascii_case(NO_CHUNK_NAME) => None,
            Some((_, name)) => Some(name.clone()),
            None => classes.get(1).cloned(),
        };
        Self {
            language: classes.first().cloned(),
            chunk_name,
            classes: ordered_set(classes.iter().cloned()),
            attributes: attributes.iter().cloned().collect(),
        }
    }
}

impl From<&ParsedOptions> for ChunkSpec {
    fn from(options: &ParsedOptions) -> Self {
        Self {
            language: options.language().map(ToString::to_string),
            chunk_name: options.chunk_name().map(ToString::to_string),
            classes: ordered_set(options.args.iter().cloned()),
            attributes: options
                .kwargs
                .iter()
                .map(|(key, value)| (key.clone(), unquote(value).to_string()))
                .collect(),
        }
    }
}

fn ordered_set(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut set: Vec<String> = Vec::new();
    for item in items {
        if !set.contains(&item) {
            set.push(item);
        }
    }
    set
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_from_parsed_options() {
        let parsed = ParsedOptions::parse(r#"r, setup, fig.cap="A, B", class="r""#).unwrap();
        let spec = ChunkSpec::from(&parsed);
        assert_eq!(spec.language.as_deref(), Some("r"));
        assert_eq!(spec.chunk_name.as_deref(), Some("setup"));
        assert_eq!(spec.classes, strings(&["r", "setup"]));
        assert_eq!(spec.attributes.get("fig.cap").map(String::as_str), Some("A, B"));
    }

    #[test]
    fn test_chunk_attribute_wins_over_second_class() {
        let spec = ChunkSpec::from_attributes(
            &strings(&["python", "first"]),
            &[("chunk".to_string(), "second".to_string())],
        );
        assert_eq!(spec.chunk_name.as_deref(), Some("second"));
    }

    #[test]
    fn test_chunk_none_attribute_clears_name() {
        let spec = ChunkSpec::from_attributes(
            &strings(&["python", "first"]),
            &[("chunk".to_string(), "NONE".to_string())],
        );
        assert_eq!(spec.chunk_name, None);
        assert_eq!(spec.language.as_deref(), Some("python"));
    }

    #[test]
    fn test_no_classes() {
        let spec = ChunkSpec::from_attributes(&[], &[]);
        assert_eq!(spec, ChunkSpec::default());
    }
}
