mod csv;
mod json;

pub use self::csv::{parse_csv, CsvOptions};
pub use self::json::{
    cell_text, detect_orientation, parse_json, table_from_records, table_from_value,
    JsonOrientation,
};
