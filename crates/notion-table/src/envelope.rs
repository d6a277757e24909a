//! Top-level response shapes: record lists, single pages and block lists.

use serde_json::{Map, Value};

use crate::block::{Document, decode_block};
use crate::errors::{NotionError, NotionResult};
use crate::record::{Record, Table, decode_record};

/// One decoded page of a paginated record listing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPage {
    pub table: Table,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockPage {
    pub document: Document,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

pub fn parse_record_list(text: &str) -> NotionResult<RecordPage> {
    let envelope = parse_envelope(text, "list")?;
    let table = results(&envelope)?
        .iter()
        .map(record_from_item)
        .collect::<NotionResult<Table>>()?;
    let (has_more, next_cursor) = continuation(&envelope);
    Ok(RecordPage {
        table,
        has_more,
        next_cursor,
    })
}

pub fn parse_single_record(text: &str) -> NotionResult<Record> {
    let envelope = parse_envelope(text, "page")?;
    record_from_item(&envelope)
}

pub fn parse_block_list(text: &str) -> NotionResult<BlockPage> {
    let envelope = parse_envelope(text, "list")?;
    let document = results(&envelope)?
        .iter()
        .map(decode_block)
        .collect::<NotionResult<Document>>()?;
    let (has_more, next_cursor) = continuation(&envelope);
    Ok(BlockPage {
        document,
        has_more,
        next_cursor,
    })
}

fn parse_envelope(text: &str, expected_object: &str) -> NotionResult<Value> {
    let envelope: Value = serde_json::from_str(text)
        .map_err(|err| NotionError::MalformedEnvelope(format!("json decode failed: {err}")))?;
    match envelope.get("object").and_then(Value::as_str) {
        Some(object) if object == expected_object => Ok(envelope),
        Some(object) => Err(NotionError::MalformedEnvelope(format!(
            "expected object '{expected_object}', found '{object}'"
        ))),
        None => Err(NotionError::MalformedEnvelope(
            "missing 'object' field".to_string(),
        )),
    }
}

fn results(envelope: &Value) -> NotionResult<&[Value]> {
    envelope
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| NotionError::MalformedEnvelope("missing 'results' array".to_string()))
}

fn continuation(envelope: &Value) -> (bool, Option<String>) {
    let has_more = envelope
        .get("has_more")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let next_cursor = envelope
        .get("next_cursor")
        .and_then(Value::as_str)
        .filter(|cursor| !cursor.is_empty())
        .map(str::to_string);
    (has_more, next_cursor)
}

fn record_from_item(item: &Value) -> NotionResult<Record> {
    let id = item
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| NotionError::MissingField("page.id".to_string()))?;
    let external_ref = item.get("url").and_then(Value::as_str).unwrap_or_default();
    let empty = Map::new();
    let properties = match item.get("properties") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(properties)) => properties,
        Some(_) => {
            return Err(NotionError::MalformedEnvelope(format!(
                "properties of page {id} is not an object"
            )));
        }
    };
    decode_record(id, external_ref, properties)
}
