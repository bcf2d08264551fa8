//! Plain values out of pandoc metadata.
//!
//! Pandoc wraps every metadata value in a tagged node (`MetaInlines`,
//! `MetaBool`, ...). Options only care about the text, booleans, lists and
//! maps underneath.
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetaValue {
    Bool(bool),
    String(String),
    List(Vec<MetaValue>),
    Map(Vec<(String, MetaValue)>),
}

impl MetaValue {
    /// Decode one pandoc metadata node.
    #[must_use]
    pub fn from_pandoc(value: &Value) -> Self {
        let content = value.get("c");
        match value.get("t").and_then(Value::as_str) {
            Some("MetaBool") => Self::Bool(content.and_then(Value::as_bool).unwrap_or_default()),
            Some("MetaString") => {
                Self::String(content.and_then(Value::as_str).unwrap_or_default().to_string())
            }
            Some("MetaInlines") => Self::String(content.map(stringify_inlines).unwrap_or_default()),
            Some("MetaBlocks") => Self::String(content.map(stringify_blocks).unwrap_or_default()),
            Some("MetaList") => Self::List(
                content
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(Self::from_pandoc).collect())
                    .unwrap_or_default(),
            ),
            Some("MetaMap") => Self::Map(
                content
                    .and_then(Value::as_object)
                    .map(decode_map)
                    .unwrap_or_default(),
            ),
            _ => Self::String(String::new()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Bool(_) | Self::List(_) | Self::Map(_) => None,
        }
    }

    /// Text form of scalars, booleans become `true`/`false`.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::List(_) | Self::Map(_) => None,
        }
    }
}

/// Decode a whole metadata map, keeping key order.
#[must_use]
pub fn decode_map(map: &Map<String, Value>) -> Vec<(String, MetaValue)> {
    map.iter()
        .map(|(key, value)| (key.clone(), MetaValue::from_pandoc(value)))
        .collect()
}

fn stringify_inlines(inlines: &Value) -> String {
    let mut text = String::new();
    for inline in inlines.as_array().into_iter().flatten() {
        stringify_inline(inline, &mut text);
    }
    text
}

fn stringify_inline(inline: &Value, text: &mut String) {
    let content = inline.get("c");
    match inline.get("t").and_then(Value::as_str) {
        Some("Str") => text.push_str(content.and_then(Value::as_str).unwrap_or_default()),
        Some("Space" | "SoftBreak") => text.push(' '),
        Some("LineBreak") => text.push('\n'),
        // [attr, text] and [type, text]
        Some("Code" | "Math" | "RawInline") => text.push_str(
            content
                .and_then(|c| c.get(1))
                .and_then(Value::as_str)
                .unwrap_or_default(),
        ),
        Some("Emph" | "Strong" | "Strikeout" | "Superscript" | "Subscript" | "SmallCaps" | "Underline") => {
            text.push_str(&content.map(stringify_inlines).unwrap_or_default());
        }
        // [extra, inlines, ...]
        Some("Quoted" | "Span" | "Link" | "Cite") => {
            let inner = content.and_then(|c| c.get(1));
            text.push_str(&inner.map(stringify_inlines).unwrap_or_default());
        }
        _ => {}
    }
}

fn stringify_blocks(blocks: &Value) -> String {
    blocks
        .as_array()
        .into_iter()
        .flatten()
        .filter(|block| {
            matches!(
                block.get("t").and_then(Value::as_str),
                Some("Plain" | "Para")
            )
        })
        .filter_map(|block| block.get("c").map(stringify_inlines))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_meta_inlines() {
        let value = json!({"t": "MetaInlines", "c": [
            {"t": "Str", "c": "pandoc"},
            {"t": "Space"},
            {"t": "Emph", "c": [{"t": "Str", "c": "-f"}]},
            {"t": "Space"},
            {"t": "Code", "c": [["", [], []], "gfm"]}
        ]});
        assert_eq!(
            MetaValue::from_pandoc(&value),
            MetaValue::String("pandoc -f gfm".to_string())
        );
    }

    #[test]
    fn test_meta_bool_and_string() {
        assert_eq!(
            MetaValue::from_pandoc(&json!({"t": "MetaBool", "c": false})),
            MetaValue::Bool(false)
        );
        assert_eq!(
            MetaValue::from_pandoc(&json!({"t": "MetaString", "c": "raise"})).as_str(),
            Some("raise")
        );
    }

    #[test]
    fn test_meta_map_and_list() {
        let value = json!({"t": "MetaMap", "c": {
            "width": {"t": "MetaInlines", "c": [{"t": "Str", "c": "5"}]},
            "tags": {"t": "MetaList", "c": [{"t": "MetaBool", "c": true}]}
        }});
        assert_eq!(
            MetaValue::from_pandoc(&value),
            MetaValue::Map(vec![
                ("width".to_string(), MetaValue::String("5".to_string())),
                ("tags".to_string(), MetaValue::List(vec![MetaValue::Bool(true)])),
            ])
        );
    }

    #[test]
    fn test_meta_blocks() {
        let value = json!({"t": "MetaBlocks", "c": [
            {"t": "Para", "c": [{"t": "Str", "c": "one"}]},
            {"t": "Para", "c": [{"t": "Str", "c": "two"}]}
        ]});
        assert_eq!(MetaValue::from_pandoc(&value).to_text().as_deref(), Some("one\n\ntwo"));
    }
}
