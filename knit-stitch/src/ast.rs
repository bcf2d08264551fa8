//! The pandoc JSON document tree.
//!
//! Only the nodes chunk execution reads or produces are modelled. Every other
//! node is kept as raw JSON and written back exactly as it was read.
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::Error as _,
    ser::SerializeMap,
};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    pub meta: Map<String, Value>,
    pub blocks: Vec<Block>,
}

type AttrRepr = (String, Vec<String>, Vec<(String, String)>);

/// `[identifier, [classes], [[key, value]]]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttrRepr", into = "AttrRepr")]
pub struct Attr {
    pub identifier: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl Attr {
    #[must_use]
    pub fn with_classes(classes: &[&str]) -> Self {
        Self {
            classes: classes.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }
}

impl From<AttrRepr> for Attr {
    fn from((identifier, classes, attributes): AttrRepr) -> Self {
        Self {
            identifier,
            classes,
            attributes,
        }
    }
}

impl From<Attr> for AttrRepr {
    fn from(attr: Attr) -> Self {
        (attr.identifier, attr.classes, attr.attributes)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    CodeBlock(Attr, String),
    RawBlock(String, String),
    Div(Attr, Vec<Block>),
    Para(Vec<Inline>),
    /// Any block read from a document other than a code block.
    Other(Value),
}

impl Block {
    /// Captured plain-text output: a code block inside an `output` div.
    #[must_use]
    pub fn plain_output(text: impl Into<String>) -> Self {
        Self::Div(
            Attr::with_classes(&["output"]),
            vec![Self::CodeBlock(Attr::default(), text.into())],
        )
    }
}

fn serialize_node<S, C>(serializer: S, tag: &str, content: &C) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    C: Serialize + ?Sized,
{
    let mut state = serializer.serialize_map(Some(2))?;
    state.serialize_entry("t", tag)?;
    state.serialize_entry("c", content)?;
    state.end()
}

impl Serialize for Block {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::CodeBlock(attr, text) => serialize_node(serializer, "CodeBlock", &(attr, text)),
            Self::RawBlock(format, text) => serialize_node(serializer, "RawBlock", &(format, text)),
            Self::Div(attr, blocks) => serialize_node(serializer, "Div", &(attr, blocks)),
            Self::Para(inlines) => serialize_node(serializer, "Para", inlines),
            Self::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.get("t").and_then(Value::as_str) != Some("CodeBlock") {
            return Ok(Self::Other(value));
        }
        let content = value.get("c").cloned().ok_or_else(|| D::Error::missing_field("c"))?;
        let (attr, text) = serde_json::from_value(content).map_err(D::Error::custom)?;
        Ok(Self::CodeBlock(attr, text))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inline {
    Str(String),
    /// `Image attr caption (url, title)`
    Image(Attr, Vec<Inline>, (String, String)),
    Other(Value),
}

impl Serialize for Inline {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Str(text) => serialize_node(serializer, "Str", text),
            Self::Image(attr, caption, target) => {
                serialize_node(serializer, "Image", &(attr, caption, target))
            }
            Self::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Inline {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::Other)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_code_block_is_modelled() {
        let block: Block = serde_json::from_value(json!({
            "t": "CodeBlock",
            "c": [["", ["python", "setup"], [["echo", "False"]]], "x = 1"]
        }))
        .unwrap();
        assert_eq!(
            block,
            Block::CodeBlock(
                Attr {
                    identifier: String::new(),
                    classes: vec!["python".to_string(), "setup".to_string()],
                    attributes: vec![("echo".to_string(), "False".to_string())],
                },
                "x = 1".to_string()
            )
        );
    }

    #[test]
    fn test_other_blocks_pass_through() {
        let text = r#"{"pandoc-api-version":[1,23,1],"meta":{"title":{"t":"MetaInlines","c":[{"t":"Str","c":"T"}]}},"blocks":[{"t":"Header","c":[1,["a",[],[]],[{"t":"Str","c":"A"}]]},{"t":"HorizontalRule"},{"t":"Para","c":[{"t":"Str","c":"x"}]}]}"#;
        let document: Document = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&document).unwrap(), text);
    }

    #[test]
    fn test_code_block_round_trips() {
        let text = r#"{"t":"CodeBlock","c":[["id",["r"],[["k","v"]]],"1 + 1"]}"#;
        let block: Block = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&block).unwrap(), text);
    }

    #[test]
    fn test_plain_output_shape() {
        assert_eq!(
            serde_json::to_value(Block::plain_output("4\n")).unwrap(),
            json!({"t": "Div", "c": [["", ["output"], []], [{"t": "CodeBlock", "c": [["", [], []], "4\n"]}]]})
        );
    }

    #[test]
    fn test_image_shape() {
        let image = Inline::Image(
            Attr {
                identifier: "plot".to_string(),
                classes: vec![],
                attributes: vec![("width".to_string(), "4".to_string())],
            },
            vec![Inline::Str("Cap".to_string())],
            ("plot.png".to_string(), "fig: plot".to_string()),
        );
        assert_eq!(
            serde_json::to_value(Block::Para(vec![image])).unwrap(),
            json!({"t": "Para", "c": [{"t": "Image", "c": [["plot", [], [["width", "4"]]], [{"t": "Str", "c": "Cap"}], ["plot.png", "fig: plot"]]}]})
        );
    }

    #[test]
    fn test_malformed_code_block_is_an_error() {
        let result: Result<Block, _> = serde_json::from_value(json!({"t": "CodeBlock", "c": [1]}));
        assert!(result.is_err());
    }
}
