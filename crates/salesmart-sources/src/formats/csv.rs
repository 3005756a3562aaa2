use ::csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::errors::SourceError;
use crate::model::{normalise_headers, RawTable, RawTableBuilder, SourceFormat};

const FORMAT: &str = "csv";

/// Reader knobs for delimited exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Leading lines to discard before the header row (e.g. a title line in a
    /// table converted from a document).
    pub skip_rows: usize,
    pub delimiter: u8,
    /// Drop records whose field count differs from the header instead of failing.
    pub skip_bad_lines: bool,
    /// Treat the first column as a positional index and discard it.
    pub drop_leading_index: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            delimiter: b',',
            skip_bad_lines: true,
            drop_leading_index: false,
        }
    }
}

pub fn parse_csv(content: &[u8], options: &CsvOptions) -> Result<RawTable, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(content);

    let mut records = reader.records().skip(options.skip_rows);

    let header = match records.next() {
        Some(record) => record.map_err(|source| SourceError::Csv {
            format: FORMAT,
            source,
        })?,
        None => {
            return Err(SourceError::FormatMismatch {
                format: FORMAT,
                reason: "payload did not contain a header row".to_string(),
            })
        }
    };

    let offset = usize::from(options.drop_leading_index);
    let headers = normalise_headers(header.iter().skip(offset));
    if headers.is_empty() {
        return Err(SourceError::InvalidHeader {
            format: FORMAT,
            message: "header row has no columns".to_string(),
        });
    }

    let width = header.len();
    let mut builder = RawTableBuilder::with_columns(headers.iter().cloned());
    let mut skipped_records = 0;

    for (record_index, record) in records.enumerate() {
        let record = record.map_err(|source| SourceError::Csv {
            format: FORMAT,
            source,
        })?;

        if record.len() != width {
            if options.skip_bad_lines {
                skipped_records += 1;
                continue;
            }
            return Err(SourceError::Record {
                format: FORMAT,
                record_index,
                message: format!("expected {width} fields, found {}", record.len()),
            });
        }

        let cells = headers
            .iter()
            .zip(record.iter().skip(offset))
            .map(|(name, value)| (name.clone(), non_empty(value)));
        builder.push_row(cells);
    }

    Ok(RawTable {
        format: SourceFormat::Csv,
        df: builder.build()?,
        skipped_records,
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
