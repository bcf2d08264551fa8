//! Marks input code blocks as notebook code cells.
//!
//! Markdown to notebook converters tell code cells from plain code blocks by a
//! class (`--match=in`). Code blocks whose `input` attribute, or else the
//! `input` document metadata, is `true` get that class. Their first class is
//! then replaced by the whole `{#id .class key=value}` attribute line, so a
//! markdown writer without fenced code attributes still prints it.
use crate::{Attr, Block, Document, MetaValue};

/// Metadata key naming the code cell class.
pub const CODECELL_MATCH_CLASS_KEY: &str = "codecell-match-class";
pub const DEFAULT_CODECELL_MATCH_CLASS: &str = "in";

const INPUT_KEY: &str = "input";

#[tracing::instrument(skip_all)]
pub fn mark_code_cells(document: &mut Document) {
    let text = |key: &str| {
        document
            .meta
            .get(key)
            .map(MetaValue::from_pandoc)
            .and_then(|value| value.to_text())
    };
    let tagger = CellTagger {
        input_default: text(INPUT_KEY),
        class: text(CODECELL_MATCH_CLASS_KEY).unwrap_or_else(|| DEFAULT_CODECELL_MATCH_CLASS.to_string()),
    };
    tracing::debug!(class = %tagger.class, "marking code cells");
    tagger.blocks(&mut document.blocks);
}

struct CellTagger {
    input_default: Option<String>,
    class: String,
}

impl CellTagger {
    fn blocks(&self, blocks: &mut [Block]) {
        for block in blocks {
            match block {
                Block::CodeBlock(attr, _) => self.code_block(attr),
                Block::Div(_, children) => self.blocks(children),
                Block::RawBlock(..) | Block::Para(_) | Block::Other(_) => {}
            }
        }
    }

    fn code_block(&self, attr: &mut Attr) {
        let input = attr
            .attributes
            .iter()
            .find(|(key, _)| key == INPUT_KEY)
            .map(|(_, value)| value.as_str())
            .or(self.input_default.as_deref());
        if !input.is_some_and(|input| input.eq_ignore_ascii_case("true")) {
            return;
        }
        if !self.class.is_empty() && !attr.classes.contains(&self.class) {
            attr.classes.push(self.class.clone());
        }
        let line = attribute_line(attr);
        if let Some(first) = attr.classes.first_mut() {
            *first = line;
        }
    }
}

fn attribute_line(attr: &Attr) -> String {
    let identifier = (!attr.identifier.is_empty()).then(|| format!("#{}", attr.identifier));
    let classes = attr.classes.iter().map(|class| format!(".{class}"));
    let attributes = attr.attributes.iter().map(|(key, value)| {
        if value.is_empty() || value.contains(char::is_whitespace) {
            format!("{key}=\"{}\"", value.replace('"', "\\\""))
        } else {
            format!("{key}={value}")
        }
    });
    let parts: Vec<String> = identifier.into_iter().chain(classes).chain(attributes).collect();
    format!("{{{}}}", parts.join(" "))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    use super::*;

    fn attr(identifier: &str, classes: &[&str], attributes: &[(&str, &str)]) -> Attr {
        Attr {
            identifier: identifier.to_string(),
            classes: classes.iter().map(ToString::to_string).collect(),
            attributes: attributes
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    fn document(meta: &serde_json::Value, blocks: Vec<Block>) -> Document {
        Document {
            api_version: vec![1, 23],
            meta: meta.as_object().cloned().unwrap_or_else(Map::new),
            blocks,
        }
    }

    fn classes(block: &Block) -> Vec<String> {
        if let Block::CodeBlock(attr, _) = block {
            attr.classes.clone()
        } else {
            vec![]
        }
    }

    #[test]
    fn test_input_blocks_are_marked() {
        let mut doc = document(
            &json!({}),
            vec![
                Block::CodeBlock(attr("fit", &["python"], &[("input", "True")]), "x".to_string()),
                Block::CodeBlock(attr("", &["python"], &[]), "y".to_string()),
            ],
        );
        mark_code_cells(&mut doc);
        assert_eq!(
            doc.blocks.first().map(classes),
            Some(vec!["{#fit .python .in input=True}".to_string(), "in".to_string()])
        );
        assert_eq!(doc.blocks.get(1).map(classes), Some(vec!["python".to_string()]));
    }

    #[test]
    fn test_metadata_defaults_and_class() {
        let meta = json!({
            "input": {"t": "MetaBool", "c": true},
            "codecell-match-class": {"t": "MetaInlines", "c": [{"t": "Str", "c": "cell"}]},
        });
        let mut doc = document(
            &meta,
            vec![
                Block::Div(
                    attr("", &["output"], &[]),
                    vec![Block::CodeBlock(attr("", &["r"], &[("fig.cap", "A plot")]), "z".to_string())],
                ),
                Block::CodeBlock(attr("", &["r"], &[("input", "false")]), "w".to_string()),
            ],
        );
        mark_code_cells(&mut doc);
        let Some(Block::Div(_, children)) = doc.blocks.first() else {
            panic!("expected the output div first, got {:?}", doc.blocks);
        };
        assert_eq!(
            children.first().map(classes),
            Some(vec![r#"{.r .cell fig.cap="A plot"}"#.to_string(), "cell".to_string()])
        );
        assert_eq!(doc.blocks.get(1).map(classes), Some(vec!["r".to_string()]));
    }
}
