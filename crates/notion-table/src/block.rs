//! Free-form page content: [`Block`] nodes, the [`Document`] they form, and
//! builders for the JSON payloads used when appending blocks.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::cell::fragment_text;
use crate::errors::{NotionError, NotionResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    pub id: String,
    /// Block type such as `paragraph` or `heading_2`. Kinds are an open set.
    pub kind: Option<String>,
    /// `None` when the node carries no type discriminator.
    pub text: Option<String>,
    pub has_children: bool,
    pub raw_source: String,
}

pub fn decode_block(node: &Value) -> NotionResult<Block> {
    let id = node
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| NotionError::MissingField("block.id".to_string()))?
        .to_string();
    let raw_source = node.to_string();
    let has_children = node
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let Some(kind) = node.get("type").and_then(Value::as_str) else {
        return Ok(Block {
            id,
            kind: None,
            text: None,
            has_children,
            raw_source,
        });
    };

    let sub = node.get(kind).ok_or_else(|| NotionError::MalformedBlock {
        id: id.clone(),
        kind: kind.to_string(),
    })?;
    let text = sub
        .get("rich_text")
        .or_else(|| sub.get("text"))
        .and_then(Value::as_array)
        .map(|fragments| fragment_text(fragments))
        .unwrap_or_default();

    Ok(Block {
        id,
        kind: Some(kind.to_string()),
        text: Some(text),
        has_children,
        raw_source,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn merge(&mut self, other: Document) {
        self.blocks.extend(other.blocks);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn find(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// Block texts, each terminated by exactly one newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let text = block.text.as_deref().unwrap_or_default();
            out.push_str(text.trim_end_matches(['\n', '\r']));
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromIterator<Block> for Document {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

fn text_fragments(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

/// Heading whose level follows the leading `#` markers. The API knows three
/// heading levels, so deeper markers clamp to `heading_3`.
pub fn heading_block(content: &str) -> Value {
    let markers = content.chars().take_while(|ch| *ch == '#').count();
    let level = markers.clamp(1, 3);
    let kind = format!("heading_{level}");
    let text = content.trim_start_matches('#').trim();
    let mut block = json!({ "object": "block", "type": kind });
    block[kind.as_str()] = json!({ "text": text_fragments(text) });
    block
}

pub fn paragraph_block(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "text": text_fragments(content) }
    })
}

pub fn code_block(content: &str, language: &str) -> Value {
    json!({
        "object": "block",
        "type": "code",
        "code": {
            "language": language,
            "text": text_fragments(content)
        }
    })
}

pub fn bulleted_list_block(title: &str, children: Vec<Value>) -> Value {
    json!({
        "object": "block",
        "type": "bulleted_list_item",
        "bulleted_list_item": {
            "text": text_fragments(title),
            "children": children
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str) -> Block {
        Block {
            id: "b".to_string(),
            kind: Some("paragraph".to_string()),
            text: Some(text.to_string()),
            has_children: false,
            raw_source: String::new(),
        }
    }

    #[test]
    fn decode_paragraph_expected_concatenated_fragments() {
        let node = json!({
            "object": "block",
            "id": "b-1",
            "type": "paragraph",
            "has_children": true,
            "paragraph": {"rich_text": [{"plain_text": "Hello, "}, {"plain_text": "world"}]}
        });
        let block = decode_block(&node).unwrap();
        assert_eq!(block.id, "b-1");
        assert_eq!(block.kind.as_deref(), Some("paragraph"));
        assert_eq!(block.text.as_deref(), Some("Hello, world"));
        assert!(block.has_children);
    }

    #[test]
    fn decode_legacy_text_list_expected_text() {
        let node = json!({
            "id": "b-2",
            "type": "heading_1",
            "heading_1": {"text": [{"plain_text": "Title"}]}
        });
        assert_eq!(decode_block(&node).unwrap().text.as_deref(), Some("Title"));
    }

    #[test]
    fn decode_sub_object_without_fragments_expected_empty_text() {
        let node = json!({"id": "b-3", "type": "divider", "divider": {}});
        assert_eq!(decode_block(&node).unwrap().text.as_deref(), Some(""));
    }

    #[test]
    fn decode_unknown_kind_present_expected_tolerated() {
        let node = json!({"id": "b-4", "type": "hologram", "hologram": {"beam": 3}});
        let block = decode_block(&node).unwrap();
        assert_eq!(block.kind.as_deref(), Some("hologram"));
        assert_eq!(block.text.as_deref(), Some(""));
    }

    #[test]
    fn decode_without_type_expected_null_text() {
        let block = decode_block(&json!({"id": "b-5"})).unwrap();
        assert_eq!(block.kind, None);
        assert_eq!(block.text, None);
    }

    #[test]
    fn decode_missing_sub_object_expected_malformed_block() {
        let error = decode_block(&json!({"id": "b-6", "type": "quote"})).unwrap_err();
        match error {
            NotionError::MalformedBlock { id, kind } => {
                assert_eq!(id, "b-6");
                assert_eq!(kind, "quote");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decode_missing_id_expected_missing_field() {
        let error = decode_block(&json!({"type": "paragraph", "paragraph": {}})).unwrap_err();
        assert!(matches!(error, NotionError::MissingField(_)));
    }

    #[test]
    fn render_with_empty_block_expected_each_line_terminated() {
        let document: Document = vec![block("A"), block(""), block("B")].into_iter().collect();
        assert_eq!(document.render(), "A\n\nB\n");
    }

    #[test]
    fn render_existing_trailing_newlines_expected_single_newline() {
        let mut document = Document::new();
        document.push(block("line\n\n"));
        document.push(Block {
            text: None,
            ..block("")
        });
        assert_eq!(document.to_string(), "line\n\n");
    }

    #[test]
    fn heading_block_markers_expected_level() {
        assert_eq!(heading_block("Intro")["type"], "heading_1");
        assert_eq!(heading_block("## Usage")["type"], "heading_2");
        let deep = heading_block("#### Deep");
        assert_eq!(deep["type"], "heading_3");
        assert_eq!(deep["heading_3"]["text"][0]["text"]["content"], "Deep");
    }

    #[test]
    fn code_block_expected_language_and_content() {
        let value = code_block("fn main() {}", "rust");
        assert_eq!(value["code"]["language"], "rust");
        assert_eq!(value["code"]["text"][0]["text"]["content"], "fn main() {}");
    }

    #[test]
    fn bulleted_list_block_expected_children_embedded() {
        let value = bulleted_list_block("Parent", vec![paragraph_block("child")]);
        let children = value["bulleted_list_item"]["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["type"], "paragraph");
    }
}
