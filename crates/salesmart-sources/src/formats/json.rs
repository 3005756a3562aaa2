use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::errors::SourceError;
use crate::model::{RawTable, RawTableBuilder, SourceFormat};

const FORMAT: &str = "json";

/// Layouts a JSON table payload may arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonOrientation {
    /// `[{"col": v, ...}, ...]`
    Records,
    /// `{"col": {"0": v, "1": v}, ...}` or `{"col": [v, v], ...}`
    Columns,
    /// `{"col": v, ...}`, a single row such as one API resource.
    Object,
}

pub fn parse_json(content: &[u8]) -> Result<RawTable, SourceError> {
    let value: Value = serde_json::from_slice(content).map_err(|source| SourceError::Json {
        format: FORMAT,
        source,
    })?;
    table_from_value(&value)
}

/// Builds a raw table from an already-decoded JSON document, detecting its orientation.
pub fn table_from_value(value: &Value) -> Result<RawTable, SourceError> {
    let orientation = detect_orientation(value).ok_or_else(|| SourceError::FormatMismatch {
        format: FORMAT,
        reason: "expected an array of objects or an object".to_string(),
    })?;

    let builder = match (orientation, value) {
        (JsonOrientation::Records, Value::Array(items)) => from_records(items)?,
        (JsonOrientation::Columns, Value::Object(map)) => from_columns(map)?,
        (JsonOrientation::Object, Value::Object(map)) => from_records(std::slice::from_ref(
            &Value::Object(map.clone()),
        ))?,
        _ => {
            return Err(SourceError::FormatMismatch {
                format: FORMAT,
                reason: format!("orientation {orientation:?} does not match payload"),
            })
        }
    };

    Ok(RawTable {
        format: SourceFormat::Json,
        df: builder.build()?,
        skipped_records: 0,
    })
}

/// Builds a table from a sequence of JSON objects, one row per object.
pub fn table_from_records(records: &[Value]) -> Result<RawTable, SourceError> {
    Ok(RawTable {
        format: SourceFormat::Json,
        df: from_records(records)?.build()?,
        skipped_records: 0,
    })
}

pub fn detect_orientation(value: &Value) -> Option<JsonOrientation> {
    match value {
        Value::Array(_) => Some(JsonOrientation::Records),
        Value::Object(map) if map.is_empty() => Some(JsonOrientation::Records),
        Value::Object(map) => {
            if map
                .values()
                .all(|v| matches!(v, Value::Object(_) | Value::Array(_)))
            {
                Some(JsonOrientation::Columns)
            } else {
                Some(JsonOrientation::Object)
            }
        }
        _ => None,
    }
}

fn from_records(items: &[Value]) -> Result<RawTableBuilder, SourceError> {
    let mut builder = RawTableBuilder::new();
    for (record_index, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(SourceError::Record {
                format: FORMAT,
                record_index,
                message: "record is not a JSON object".to_string(),
            });
        };
        builder.push_row(map.iter().map(|(key, value)| (key.as_str(), cell_text(value))));
    }
    Ok(builder)
}

fn from_columns(map: &Map<String, Value>) -> Result<RawTableBuilder, SourceError> {
    let labels = row_labels(map);
    let mut builder = RawTableBuilder::with_columns(map.keys().cloned());

    for (position, label) in labels.iter().enumerate() {
        let cells = map.iter().map(|(column, values)| {
            let cell = match values {
                Value::Object(by_label) => by_label.get(label).and_then(cell_text),
                Value::Array(items) => items.get(position).and_then(cell_text),
                _ => None,
            };
            (column.as_str(), cell)
        });
        builder.push_row(cells);
    }

    Ok(builder)
}

/// Row labels in their natural order: numeric labels sort numerically, anything
/// else keeps first-seen order.
fn row_labels(map: &Map<String, Value>) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut array_len = 0usize;

    for values in map.values() {
        match values {
            Value::Object(by_label) => {
                for key in by_label.keys() {
                    if seen.insert(key.as_str()) {
                        labels.push(key.clone());
                    }
                }
            }
            Value::Array(items) => array_len = array_len.max(items.len()),
            _ => {}
        }
    }

    if labels.is_empty() {
        return (0..array_len).map(|idx| idx.to_string()).collect();
    }

    if labels.iter().all(|label| label.parse::<u64>().is_ok()) {
        labels.sort_by_key(|label| label.parse::<u64>().unwrap_or(u64::MAX));
    }
    labels
}

/// Renders a JSON scalar as the raw text a delimited export would have held.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}
