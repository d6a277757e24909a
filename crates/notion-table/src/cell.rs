//! Property decoding: one raw `(name, typed value)` pair into a [`Cell`].
//!
//! The raw value carries a `type` discriminator and a sibling object named
//! after that discriminator, e.g. `{"type": "select", "select": {"name": "A"}}`.
//! The set of understood kinds is closed; anything else is rejected with
//! [`NotionError::UnsupportedKind`].

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::errors::{NotionError, NotionResult};

/// Property discriminator as read from the payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Title,
    RichText,
    /// Pre-2021 spelling of `rich_text`, still emitted by older workspaces.
    Text,
    MultiSelect,
    Select,
    Number,
    Date,
    Checkbox,
    People,
    Url,
    Email,
    PhoneNumber,
    Files,
    Relation,
    Rollup,
    Formula,
    Unrecognized(String),
}

impl TypeTag {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "text" => Self::Text,
            "multi_select" => Self::MultiSelect,
            "select" => Self::Select,
            "number" => Self::Number,
            "date" => Self::Date,
            "checkbox" => Self::Checkbox,
            "people" => Self::People,
            "url" => Self::Url,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "files" => Self::Files,
            "relation" => Self::Relation,
            "rollup" => Self::Rollup,
            "formula" => Self::Formula,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Wire name, which is also the key of the kind-specific sub-object.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Text => "text",
            Self::MultiSelect => "multi_select",
            Self::Select => "select",
            Self::Number => "number",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::People => "people",
            Self::Url => "url",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Files => "files",
            Self::Relation => "relation",
            Self::Rollup => "rollup",
            Self::Formula => "formula",
            Self::Unrecognized(tag) => tag,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Decoded value of a cell; the variant is chosen by the cell's [`TypeTag`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// The payload had no type discriminator.
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(DateTime<FixedOffset>),
    List(Vec<String>),
    /// Recognized kind whose content is not decoded (files, rollup).
    Empty,
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => f.write_str(&render_number(*number)),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            Self::List(items) => f.write_str(&items.join(", ")),
            Self::Empty => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub name: String,
    pub kind: Option<TypeTag>,
    pub value: CellValue,
    /// Untouched serialized property, kept for diagnostics.
    pub raw_source: String,
}

pub fn decode_cell(name: &str, raw: &Value) -> NotionResult<Cell> {
    let raw_source = raw.to_string();
    let Some(tag) = raw.get("type").and_then(Value::as_str) else {
        return Ok(Cell {
            name: name.to_string(),
            kind: None,
            value: CellValue::Null,
            raw_source,
        });
    };

    let kind = TypeTag::parse(tag);
    let value = decode_value(name, &kind, raw.get(kind.as_str()))?;
    Ok(Cell {
        name: name.to_string(),
        kind: Some(kind),
        value,
        raw_source,
    })
}

fn decode_value(name: &str, kind: &TypeTag, sub: Option<&Value>) -> NotionResult<CellValue> {
    let sub = sub.filter(|value| !value.is_null());
    let value = match kind {
        TypeTag::Title | TypeTag::RichText | TypeTag::Text => {
            CellValue::Text(fragment_text(fragment_list(name, sub)?))
        }
        TypeTag::MultiSelect | TypeTag::People => CellValue::List(
            fragment_list(name, sub)?
                .iter()
                .map(|item| project_item(item, &["name", "id"]))
                .collect(),
        ),
        TypeTag::Relation => CellValue::List(
            fragment_list(name, sub)?
                .iter()
                .map(|item| project_item(item, &["id", "name"]))
                .collect(),
        ),
        TypeTag::Select => CellValue::Text(
            sub.and_then(|option| option.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        TypeTag::Number => match sub {
            None => CellValue::Number(0.0),
            Some(value) => CellValue::Number(
                value
                    .as_f64()
                    .ok_or_else(|| NotionError::conversion(name, "number", value.to_string()))?,
            ),
        },
        TypeTag::Date => match sub
            .and_then(|date| date.get("start"))
            .and_then(Value::as_str)
        {
            Some(start) => CellValue::Timestamp(parse_timestamp(name, start)?),
            None => CellValue::Text(String::new()),
        },
        TypeTag::Checkbox => match sub {
            Some(Value::Bool(flag)) => CellValue::Bool(*flag),
            Some(other) => return Err(NotionError::conversion(name, "bool", other.to_string())),
            None => return Err(NotionError::conversion(name, "bool", "null")),
        },
        TypeTag::Url | TypeTag::Email | TypeTag::PhoneNumber => match sub {
            None => CellValue::Text(String::new()),
            Some(Value::String(text)) => CellValue::Text(text.clone()),
            Some(other) => {
                return Err(NotionError::conversion(name, "string", other.to_string()));
            }
        },
        TypeTag::Files | TypeTag::Rollup => CellValue::Empty,
        TypeTag::Formula => CellValue::Text(formula_text(sub)),
        TypeTag::Unrecognized(tag) => {
            return Err(NotionError::UnsupportedKind { kind: tag.clone() });
        }
    };
    Ok(value)
}

fn fragment_list<'a>(name: &str, sub: Option<&'a Value>) -> NotionResult<&'a [Value]> {
    match sub {
        None => Ok(Default::default()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(NotionError::conversion(name, "list", other.to_string())),
    }
}

/// Concatenates the `plain_text` of each rich-text fragment in source order.
/// Fragments without `plain_text` fall back to `text.content`.
pub(crate) fn fragment_text(fragments: &[Value]) -> String {
    fragments
        .iter()
        .filter_map(|fragment| {
            fragment
                .get("plain_text")
                .and_then(Value::as_str)
                .or_else(|| {
                    fragment
                        .get("text")
                        .and_then(|text| text.get("content"))
                        .and_then(Value::as_str)
                })
        })
        .collect()
}

fn project_item(item: &Value, keys: &[&str]) -> String {
    if let Some(text) = item.as_str() {
        return text.to_string();
    }
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn formula_text(sub: Option<&Value>) -> String {
    let Some(formula) = sub else {
        return String::new();
    };
    if let Some(text) = formula.get("string").and_then(Value::as_str) {
        return text.to_string();
    }
    match formula.get("number") {
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn parse_timestamp(name: &str, raw: &str) -> NotionResult<DateTime<FixedOffset>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc().fixed_offset())
        .map_err(|_| NotionError::conversion(name, "timestamp", raw))
}

pub(crate) fn render_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn title_fragments_out_of_order_expected_source_order() {
        let raw = json!({
            "type": "title",
            "title": [
                {"plain_text": "zebra "},
                {"plain_text": "apple "},
                {"plain_text": "mango"}
            ]
        });
        let cell = decode_cell("Name", &raw).unwrap();
        assert_eq!(cell.kind, Some(TypeTag::Title));
        assert_eq!(cell.value, CellValue::Text("zebra apple mango".to_string()));
        assert_eq!(cell.raw_source, raw.to_string());
    }

    #[test]
    fn rich_text_empty_list_expected_empty_string() {
        let cell = decode_cell("Notes", &json!({"type": "rich_text", "rich_text": []})).unwrap();
        assert_eq!(cell.value, CellValue::Text(String::new()));
    }

    #[test]
    fn legacy_text_fragment_without_plain_text_expected_content_fallback() {
        let raw = json!({"type": "text", "text": [{"text": {"content": "hello"}}]});
        let cell = decode_cell("Text", &raw).unwrap();
        assert_eq!(cell.value, CellValue::Text("hello".to_string()));
    }

    #[test]
    fn missing_discriminator_expected_untyped_null_cell() {
        let cell = decode_cell("admin", &json!({"id": "xyz"})).unwrap();
        assert_eq!(cell.kind, None);
        assert_eq!(cell.value, CellValue::Null);
    }

    #[test]
    fn unknown_discriminator_expected_unsupported_kind_with_tag() {
        let error = decode_cell("thing", &json!({"type": "widget", "widget": {}})).unwrap_err();
        match error {
            NotionError::UnsupportedKind { kind } => assert_eq!(kind, "widget"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn select_null_expected_empty_string() {
        let cell = decode_cell("select", &json!({"type": "select", "select": null})).unwrap();
        assert_eq!(cell.value, CellValue::Text(String::new()));
    }

    #[test]
    fn select_present_expected_option_name() {
        let raw = json!({"type": "select", "select": {"id": "1", "name": "Done", "color": "green"}});
        let cell = decode_cell("Status", &raw).unwrap();
        assert_eq!(cell.value, CellValue::Text("Done".to_string()));
    }

    #[test]
    fn multi_select_expected_names_in_order() {
        let raw = json!({
            "type": "multi_select",
            "multi_select": [{"name": "b"}, {"name": "a"}, {"name": "c"}]
        });
        let cell = decode_cell("Tags", &raw).unwrap();
        assert_eq!(
            cell.value,
            CellValue::List(vec!["b".to_string(), "a".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn people_without_name_expected_id_fallback() {
        let raw = json!({
            "type": "people",
            "people": [{"object": "user", "id": "u-1"}, {"id": "u-2", "name": "Ada"}]
        });
        let cell = decode_cell("Person", &raw).unwrap();
        assert_eq!(
            cell.value,
            CellValue::List(vec!["u-1".to_string(), "Ada".to_string()])
        );
    }

    #[test]
    fn relation_expected_ids() {
        let raw = json!({"type": "relation", "relation": [{"id": "p-1"}, {"id": "p-2"}]});
        let cell = decode_cell("Links", &raw).unwrap();
        assert_eq!(cell.value.as_list(), Some(&["p-1".to_string(), "p-2".to_string()][..]));
    }

    #[test]
    fn number_absent_expected_zero() {
        let cell = decode_cell("count", &json!({"type": "number", "number": null})).unwrap();
        assert_eq!(cell.value, CellValue::Number(0.0));
        let cell = decode_cell("count", &json!({"type": "number"})).unwrap();
        assert_eq!(cell.value, CellValue::Number(0.0));
    }

    #[test]
    fn number_string_payload_expected_conversion_error() {
        let error = decode_cell("count", &json!({"type": "number", "number": "five"})).unwrap_err();
        assert!(matches!(error, NotionError::Conversion { expected: "number", .. }));
    }

    // Absent numbers decode to zero while absent checkboxes fail; both
    // behaviors are asserted so a change to either is noticed.
    #[test]
    fn checkbox_absent_expected_conversion_error() {
        let error = decode_cell("check", &json!({"type": "checkbox", "checkbox": null})).unwrap_err();
        assert!(matches!(error, NotionError::Conversion { expected: "bool", .. }));
        let error = decode_cell("check", &json!({"type": "checkbox"})).unwrap_err();
        assert!(matches!(error, NotionError::Conversion { .. }));
    }

    #[test]
    fn checkbox_true_expected_bool() {
        let cell = decode_cell("check", &json!({"type": "checkbox", "checkbox": true})).unwrap();
        assert_eq!(cell.value, CellValue::Bool(true));
    }

    #[test]
    fn date_with_offset_expected_timestamp() {
        let raw = json!({"type": "date", "date": {"start": "2021-08-16T10:30:00.000+02:00", "end": null}});
        let cell = decode_cell("date", &raw).unwrap();
        let expected = DateTime::parse_from_rfc3339("2021-08-16T10:30:00+02:00").unwrap();
        assert_eq!(cell.value, CellValue::Timestamp(expected));
    }

    #[test]
    fn date_only_expected_midnight_utc() {
        let cell = decode_cell("date", &json!({"type": "date", "date": {"start": "2022-01-31"}})).unwrap();
        assert_eq!(cell.value.to_string(), "2022-01-31T00:00:00+00:00");
    }

    #[test]
    fn date_null_expected_empty_string() {
        let cell = decode_cell("date", &json!({"type": "date", "date": null})).unwrap();
        assert_eq!(cell.value, CellValue::Text(String::new()));
    }

    #[test]
    fn date_garbage_expected_conversion_error() {
        let error = decode_cell("date", &json!({"type": "date", "date": {"start": "soon"}})).unwrap_err();
        assert!(matches!(error, NotionError::Conversion { expected: "timestamp", .. }));
    }

    #[test]
    fn url_email_phone_expected_passthrough() {
        for (tag, text) in [
            ("url", "not a url"),
            ("email", "a@b"),
            ("phone_number", "+33 1 23"),
        ] {
            let raw = json!({"type": tag, tag: text});
            let cell = decode_cell(tag, &raw).unwrap();
            assert_eq!(cell.value, CellValue::Text(text.to_string()));
        }
    }

    #[test]
    fn files_and_rollup_expected_empty_placeholder() {
        let files = decode_cell("f", &json!({"type": "files", "files": [{"name": "a.png"}]})).unwrap();
        assert_eq!(files.value, CellValue::Empty);
        let rollup = decode_cell("r", &json!({"type": "rollup", "rollup": {"type": "number", "number": 4}})).unwrap();
        assert_eq!(rollup.value, CellValue::Empty);
    }

    #[test]
    fn formula_prefers_string_then_number_expected_text() {
        let string = json!({"type": "formula", "formula": {"type": "string", "string": "ok", "number": 2}});
        assert_eq!(decode_cell("f", &string).unwrap().value, CellValue::Text("ok".to_string()));

        let number = json!({"type": "formula", "formula": {"type": "number", "number": 12.5}});
        assert_eq!(decode_cell("f", &number).unwrap().value, CellValue::Text("12.5".to_string()));

        let boolean = json!({"type": "formula", "formula": {"type": "boolean", "boolean": true}});
        assert_eq!(decode_cell("f", &boolean).unwrap().value, CellValue::Text(String::new()));
    }

    #[test]
    fn decode_same_input_twice_expected_identical_cells() {
        let raw = json!({"type": "multi_select", "multi_select": [{"name": "x"}]});
        assert_eq!(decode_cell("t", &raw).unwrap(), decode_cell("t", &raw).unwrap());
    }

    #[test]
    fn render_number_integral_expected_no_fraction() {
        assert_eq!(render_number(3.0), "3");
        assert_eq!(render_number(-2.5), "-2.5");
    }
}
