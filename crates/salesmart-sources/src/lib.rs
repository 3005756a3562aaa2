//! Decoders that turn raw source payloads into untyped string tables.

pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::SourceError;
pub use formats::{
    cell_text, parse_csv, parse_json, table_from_records, table_from_value, CsvOptions,
    JsonOrientation,
};
pub use model::{normalise_headers, RawTable, RawTableBuilder, SourceFormat};
pub use registry::{format_from_location, parse_located, parse_source};
