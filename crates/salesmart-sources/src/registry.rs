use std::path::Path;

use crate::errors::SourceError;
use crate::formats::{parse_csv, parse_json, CsvOptions};
use crate::model::{RawTable, SourceFormat};

/// Infers the payload format from a path, URL or object key by its extension.
pub fn format_from_location(location: &str) -> Result<SourceFormat, SourceError> {
    let without_query = location.split(['?', '#']).next().unwrap_or(location);
    Path::new(without_query)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| SourceFormat::try_from(ext).ok())
        .ok_or_else(|| SourceError::UnknownFormat(location.to_string()))
}

pub fn parse_source(
    content: &[u8],
    format: SourceFormat,
    csv_options: &CsvOptions,
) -> Result<RawTable, SourceError> {
    match format {
        SourceFormat::Csv => parse_csv(content, csv_options),
        SourceFormat::Json => parse_json(content),
    }
}

/// Decodes a payload whose format is implied by where it came from.
pub fn parse_located(
    location: &str,
    content: &[u8],
    csv_options: &CsvOptions,
) -> Result<RawTable, SourceError> {
    let format = format_from_location(location)?;
    parse_source(content, format, csv_options)
}
