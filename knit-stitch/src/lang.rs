use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::meta::MetaValue;

const KERNELS: [(&str, &str); 9] = [
    ("python", "python3"),
    ("py", "python3"),
    ("python3", "python3"),
    ("r", "ir"),
    ("R", "ir"),
    ("julia", "julia"),
    ("jl", "julia"),
    ("sh", "bash"),
    ("bash", "bash"),
];

const STYLES: [(&str, &str); 3] = [("py", "python"), ("jl", "julia"), ("sh", "bash")];

/// Maps chunk languages to kernel names and to highlighting styles.
///
/// A language without a kernel is never executed, its block is copied to the
/// output unchanged.
#[derive(Clone, Debug)]
pub struct LangMapper {
    kernels: FxHashMap<String, String>,
    styles: FxHashMap<String, String>,
}

impl Default for LangMapper {
    fn default() -> Self {
        let owned = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect()
        };
        Self {
            kernels: owned(&KERNELS),
            styles: owned(&STYLES),
        }
    }
}

impl LangMapper {
    /// Built-in maps extended by the `kernels-map` and `styles-map` metadata.
    #[must_use]
    pub fn from_metadata(meta: &Map<String, Value>) -> Self {
        let mut mapper = Self::default();
        extend(&mut mapper.kernels, meta.get("kernels-map"));
        extend(&mut mapper.styles, meta.get("styles-map"));
        mapper
    }

    #[must_use]
    pub fn kernel(&self, language: &str) -> Option<&str> {
        self.kernels.get(language).map(String::as_str)
    }

    /// Highlighting style for a language, the language itself when unmapped.
    #[must_use]
    pub fn style<'a>(&'a self, language: &'a str) -> &'a str {
        self.styles.get(language).map_or(language, String::as_str)
    }
}

fn extend(map: &mut FxHashMap<String, String>, value: Option<&Value>) {
    let Some(MetaValue::Map(entries)) = value.map(MetaValue::from_pandoc) else {
        return;
    };
    for (language, target) in entries {
        match target.to_text() {
            Some(target) => {
                map.insert(language, target);
            }
            None => tracing::warn!(%language, "ignoring non-text language mapping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let mapper = LangMapper::default();
        assert_eq!(mapper.kernel("py"), Some("python3"));
        assert_eq!(mapper.kernel("R"), Some("ir"));
        assert_eq!(mapper.kernel("md"), None);
        assert_eq!(mapper.style("jl"), "julia");
        assert_eq!(mapper.style("python"), "python");
    }

    #[test]
    fn test_metadata_overrides() {
        let meta = json!({
            "kernels-map": {"t": "MetaMap", "c": {
                "py": {"t": "MetaInlines", "c": [{"t": "Str", "c": "python2"}]},
                "js": {"t": "MetaInlines", "c": [{"t": "Str", "c": "node"}]}
            }},
            "styles-map": {"t": "MetaMap", "c": {
                "js": {"t": "MetaInlines", "c": [{"t": "Str", "c": "javascript"}]}
            }}
        });
        let mapper = LangMapper::from_metadata(meta.as_object().unwrap_or(&Map::new()));
        assert_eq!(mapper.kernel("py"), Some("python2"));
        assert_eq!(mapper.kernel("js"), Some("node"));
        assert_eq!(mapper.style("js"), "javascript");
    }
}
