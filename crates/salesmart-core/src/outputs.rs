//! Writing cleaned tables to local files for offline runs.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(OutputFormat::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Ok(OutputFormat::Parquet),
            _ => bail!("cannot infer output format of {}", path.display()),
        }
    }
}

pub fn create_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut clone = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut clone)
        .context("failed to write csv to buffer")?;
    Ok(buffer)
}

pub fn create_parquet_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)
            .context("failed to write parquet to buffer")?;
    }
    Ok(buffer)
}

/// Writes `df` to `path`, choosing CSV or Parquet by extension.
pub fn write_table_file(df: &DataFrame, path: &Path) -> Result<()> {
    let bytes = match OutputFormat::from_path(path)? {
        OutputFormat::Csv => create_csv_bytes(df)?,
        OutputFormat::Parquet => create_parquet_bytes(df)?,
    };
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    std::io::Write::write_all(&mut file, &bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
