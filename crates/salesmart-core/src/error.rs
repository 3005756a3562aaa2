use thiserror::Error;

use crate::entities::Entity;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("{entity} source is missing expected column `{column}`")]
    MissingColumn { entity: Entity, column: String },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("no source configured for entity `{0}`")]
    MissingSource(String),

    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("year range {start}..={end} is empty")]
    EmptyYearRange { start: i64, end: i64 },

    #[error("{0} is not configured")]
    MissingSetting(&'static str),
}

#[cfg(feature = "runtime")]
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("destination table `{0}` already exists")]
    TableExists(String),

    #[error("column `{column}` has unsupported type {dtype}")]
    UnsupportedType { column: String, dtype: String },

    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
