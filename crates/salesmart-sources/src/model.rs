use std::collections::HashMap;
use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::SourceError;

/// Payload encodings a raw table can be decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Json,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Json => "json",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceFormat {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "json" => Ok(SourceFormat::Json),
            other => Err(format!("unknown source format '{other}'")),
        }
    }
}

/// A decoded, untransformed source table. Every column is a nullable string.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub format: SourceFormat,
    pub df: DataFrame,
    /// Records dropped while decoding because their shape did not match the header.
    pub skipped_records: usize,
}

impl RawTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }
}

/// Accumulates string cells row by row while tolerating records that introduce
/// new columns part way through (JSON objects do not share a fixed schema).
#[derive(Debug, Default)]
pub struct RawTableBuilder {
    order: Vec<String>,
    positions: HashMap<String, usize>,
    values: Vec<Vec<Option<String>>>,
    rows: usize,
}

impl RawTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::new();
        for name in columns {
            builder.ensure_column(name.into());
        }
        builder
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.order
    }

    fn ensure_column(&mut self, name: String) -> usize {
        if let Some(&idx) = self.positions.get(&name) {
            return idx;
        }
        let idx = self.order.len();
        self.positions.insert(name.clone(), idx);
        self.order.push(name);
        self.values.push(vec![None; self.rows]);
        idx
    }

    /// Appends one row. Columns absent from `cells` are left null.
    pub fn push_row<I, K>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        for column in &mut self.values {
            column.push(None);
        }
        self.rows += 1;

        for (name, value) in cells {
            let idx = self.ensure_column(name.into());
            if let Some(slot) = self.values[idx].last_mut() {
                *slot = value;
            }
        }
    }

    pub fn build(self) -> Result<DataFrame, SourceError> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.order.len());
        for (name, values) in self.order.iter().zip(self.values.iter()) {
            let utf8: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
            columns.push(Series::new(name.as_str().into(), utf8).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Renames blank and repeated header cells the way spreadsheet exports are
/// conventionally read: blanks become `Unnamed: {position}` and repeats gain a
/// `.{n}` suffix.
pub fn normalise_headers<'a, I>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (position, raw) in headers.into_iter().enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {position}")
        } else {
            trimmed.to_string()
        };

        let count = seen.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base
        } else {
            format!("{base}.{count}")
        };
        *count += 1;
        names.push(name);
    }

    names
}
