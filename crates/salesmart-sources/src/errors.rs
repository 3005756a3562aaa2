use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{format} format mismatch: {reason}")]
    FormatMismatch {
        format: &'static str,
        reason: String,
    },

    #[error("{format} header invalid: {message}")]
    InvalidHeader {
        format: &'static str,
        message: String,
    },

    #[error("{format} CSV error: {source}")]
    Csv {
        format: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{format} JSON error: {source}")]
    Json {
        format: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{format} record {record_index} invalid: {message}")]
    Record {
        format: &'static str,
        record_index: usize,
        message: String,
    },

    #[error("failed to build raw table: {0}")]
    Table(#[from] polars::error::PolarsError),

    #[error("could not determine source format for '{0}'")]
    UnknownFormat(String),
}
