//! Database rows: a [`Record`] per page, a [`Table`] per query.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cell::{Cell, CellValue, decode_cell, render_number};
use crate::errors::{NotionError, NotionResult};

static NULL_VALUE: CellValue = CellValue::Null;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub external_ref: String,
    pub cells: Vec<Cell>,
}

/// Decodes every property in source order. The first cell that fails aborts
/// the whole record.
pub fn decode_record(
    id: impl Into<String>,
    external_ref: impl Into<String>,
    properties: &Map<String, Value>,
) -> NotionResult<Record> {
    let cells = properties
        .iter()
        .map(|(name, raw)| decode_cell(name, raw))
        .collect::<NotionResult<Vec<_>>>()?;
    Ok(Record {
        id: id.into(),
        external_ref: external_ref.into(),
        cells,
    })
}

impl Record {
    /// First cell with `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|cell| cell.name.as_str())
    }

    /// Value of `name`, or [`CellValue::Null`] when the field is absent.
    pub fn get_value(&self, name: &str) -> &CellValue {
        match self.get(name) {
            Some(cell) => &cell.value,
            None => {
                self.warn_missing(name);
                &NULL_VALUE
            }
        }
    }

    pub fn get_string(&self, name: &str) -> NotionResult<String> {
        let Some(cell) = self.get(name) else {
            self.warn_missing(name);
            return Ok(String::new());
        };
        Ok(match &cell.value {
            CellValue::Null | CellValue::Empty => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => render_number(*number),
            CellValue::Bool(flag) => flag.to_string(),
            CellValue::Timestamp(ts) => ts.to_rfc3339(),
            CellValue::List(items) => items.join(", "),
        })
    }

    pub fn get_int(&self, name: &str) -> NotionResult<i64> {
        let Some(cell) = self.get(name) else {
            self.warn_missing(name);
            return Ok(0);
        };
        match &cell.value {
            CellValue::Null | CellValue::Empty => Ok(0),
            CellValue::Number(number) if is_whole_i64(*number) => Ok(*number as i64),
            CellValue::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| NotionError::conversion(name, "int", text.as_str())),
            other => Err(NotionError::conversion(name, "int", other.to_string())),
        }
    }

    pub fn get_float(&self, name: &str) -> NotionResult<f64> {
        let Some(cell) = self.get(name) else {
            self.warn_missing(name);
            return Ok(0.0);
        };
        match &cell.value {
            CellValue::Null | CellValue::Empty => Ok(0.0),
            CellValue::Number(number) => Ok(*number),
            CellValue::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| NotionError::conversion(name, "float", text.as_str())),
            other => Err(NotionError::conversion(name, "float", other.to_string())),
        }
    }

    pub fn get_bool(&self, name: &str) -> NotionResult<bool> {
        let Some(cell) = self.get(name) else {
            self.warn_missing(name);
            return Ok(false);
        };
        match &cell.value {
            CellValue::Null | CellValue::Empty => Ok(false),
            CellValue::Bool(flag) => Ok(*flag),
            CellValue::Text(text) => text
                .trim()
                .parse::<bool>()
                .map_err(|_| NotionError::conversion(name, "bool", text.as_str())),
            other => Err(NotionError::conversion(name, "bool", other.to_string())),
        }
    }

    fn warn_missing(&self, name: &str) {
        tracing::warn!(record = %self.id, field = name, "field not present in record");
    }
}

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn is_whole_i64(number: f64) -> bool {
    number.fract() == 0.0 && number >= i64::MIN as f64 && number < i64::MAX as f64
}

/// Ordered collection of records assembled page by page.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    pub records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Appends `other` after the existing records. No deduplication.
    pub fn merge(&mut self, other: Table) {
        self.records.extend(other.records);
    }

    pub fn merged(mut self, other: Table) -> Table {
        self.merge(other);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn row(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn find(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Value of `column` in row `index`; `None` when the row does not exist.
    pub fn value(&self, index: usize, column: &str) -> Option<&CellValue> {
        self.row(index).map(|record| record.get_value(column))
    }
}

impl IntoIterator for Table {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
