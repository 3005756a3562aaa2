use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use polars::prelude::*;
use tracing::{debug, info};

use super::{CleanedTable, CleaningReport};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::validators::present;

/// Columns some exports carry that never hold entity data.
pub const STRAY_COLUMNS: &[&str] = &["index", "level_0", "Unnamed: 0", "1", "lat"];

/// Days from 0001-01-01 to the Unix epoch; polars dates count from the latter.
pub const EPOCH_DAYS_FROM_CE: i32 = 719_163;
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
const KEY_SEPARATOR: &str = "\u{1f}";

/// Read access to the string cells of a raw table.
pub struct RawView<'a> {
    entity: Entity,
    raw: &'a DataFrame,
}

impl<'a> RawView<'a> {
    /// Fails with [`CleaningError::MissingColumn`] on the first expected column
    /// the raw table does not carry. Other columns are ignored.
    pub fn new(entity: Entity, raw: &'a DataFrame, expected: &[&str]) -> Result<Self, CleaningError> {
        if let Some(column) = expected
            .iter()
            .find(|column| raw.get_column_index(column).is_none())
        {
            return Err(CleaningError::MissingColumn {
                entity,
                column: column.to_string(),
            });
        }

        let (stray, extra): (Vec<&str>, Vec<&str>) = raw
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .filter(|name| !expected.contains(name))
            .partition(|name| STRAY_COLUMNS.contains(name));
        if !stray.is_empty() {
            debug!(entity = entity.code(), columns = ?stray, "dropping stray index columns");
        }
        if !extra.is_empty() {
            debug!(entity = entity.code(), columns = ?extra, "dropping columns outside the output schema");
        }

        Ok(Self { entity, raw })
    }

    /// Trimmed cell text with null placeholders mapped to `None`.
    pub fn text(&self, name: &str) -> Result<Vec<Option<String>>, CleaningError> {
        let column = self
            .raw
            .column(name)
            .map_err(|_| CleaningError::MissingColumn {
                entity: self.entity,
                column: name.to_string(),
            })?;
        let as_text = column.cast(&DataType::String)?;
        let values = as_text
            .str()?
            .into_iter()
            .map(|cell| present(cell.map(str::trim)).map(str::to_string))
            .collect();
        Ok(values)
    }

    /// Applies a field rule to every present cell of `name`.
    pub fn validated<T>(
        &self,
        name: &str,
        rule: impl Fn(&str) -> Option<T>,
    ) -> Result<Vec<Option<T>>, CleaningError> {
        Ok(self
            .text(name)?
            .iter()
            .map(|cell| cell.as_deref().and_then(&rule))
            .collect())
    }
}

pub fn text_column(name: &str, values: Vec<Option<String>>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn int_column(name: &str, values: Vec<Option<i64>>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn float_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn date_column(name: &str, values: &[Option<NaiveDate>]) -> Result<Column, CleaningError> {
    let days: Vec<Option<i32>> = values
        .iter()
        .map(|value| value.map(|date| date.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
        .collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?.into())
}

pub fn time_column(name: &str, values: &[Option<NaiveTime>]) -> Result<Column, CleaningError> {
    let nanos: Vec<Option<i64>> = values
        .iter()
        .map(|value| {
            value.map(|time| {
                i64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND
                    + i64::from(time.nanosecond())
            })
        })
        .collect();
    Ok(Series::new(name.into(), nanos).cast(&DataType::Time)?.into())
}

/// Row-level cleanup shared by every cleaner: rows with any missing cell are
/// dropped, then exact duplicates, then rows repeating a value of any
/// `unique_by` column. The first occurrence always wins and surviving rows
/// keep their input order.
pub fn finalise(
    entity: Entity,
    columns: Vec<Column>,
    unique_by: &[&str],
) -> Result<CleanedTable, CleaningError> {
    let df = DataFrame::new(columns)?;
    let rows_in = df.height();

    let as_text = df
        .get_columns()
        .iter()
        .map(|column| column.cast(&DataType::String))
        .collect::<PolarsResult<Vec<Column>>>()?;
    let cells = as_text
        .iter()
        .map(|column| -> PolarsResult<Vec<Option<&str>>> {
            Ok(column.str()?.into_iter().collect())
        })
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut unique_positions = Vec::with_capacity(unique_by.len());
    for name in unique_by {
        let position = df
            .get_column_index(name)
            .ok_or_else(|| CleaningError::MissingColumn {
                entity,
                column: name.to_string(),
            })?;
        unique_positions.push(position);
    }

    let mut keep = Vec::with_capacity(rows_in);
    let mut seen_rows: HashSet<String> = HashSet::new();
    let mut seen_unique: Vec<HashSet<&str>> = vec![HashSet::new(); unique_positions.len()];
    let mut dropped_missing = 0usize;
    let mut dropped_duplicate = 0usize;

    for idx in 0..rows_in {
        let row: Option<Vec<&str>> = cells.iter().map(|column| column[idx]).collect();
        let Some(row) = row else {
            dropped_missing += 1;
            keep.push(false);
            continue;
        };

        let repeats_unique = unique_positions
            .iter()
            .zip(seen_unique.iter())
            .any(|(&position, seen)| seen.contains(row[position]));
        if repeats_unique || !seen_rows.insert(row.join(KEY_SEPARATOR)) {
            dropped_duplicate += 1;
            keep.push(false);
            continue;
        }

        for (&position, seen) in unique_positions.iter().zip(seen_unique.iter_mut()) {
            seen.insert(row[position]);
        }
        keep.push(true);
    }

    let mask = BooleanChunked::new("keep".into(), keep.as_slice());
    let cleaned = df.filter(&mask)?;

    let report = CleaningReport {
        entity,
        rows_in,
        rows_out: cleaned.height(),
        rows_dropped_missing: dropped_missing,
        rows_dropped_duplicate: dropped_duplicate,
    };
    info!(
        entity = entity.code(),
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        rows_dropped_missing = report.rows_dropped_missing,
        rows_dropped_duplicate = report.rows_dropped_duplicate,
        "cleaned entity"
    );

    Ok(CleanedTable { df: cleaned, report })
}
