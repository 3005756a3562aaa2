use polars::prelude::DataFrame;

use super::table::{finalise, int_column, text_column, RawView};
use super::{CleanedTable, CleaningOptions};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::validators::{
    card_number, matches_pattern, parse_integer, PRODUCT_CODE_PATTERN, STORE_CODE_PATTERN,
    UUID_PATTERN,
};

const COLUMNS: &[&str] = &[
    "date_uuid",
    "user_uuid",
    "card_number",
    "store_code",
    "product_code",
    "product_quantity",
];

/// Foreign keys are checked with the exact rule of the dimension that owns
/// them. The customer name columns duplicate `dim_users` and are dropped.
pub fn clean_orders(raw: &DataFrame, _options: &CleaningOptions) -> Result<CleanedTable, CleaningError> {
    let view = RawView::new(Entity::Orders, raw, COLUMNS)?;

    let columns = vec![
        text_column(
            "date_uuid",
            view.validated("date_uuid", |v| matches_pattern(v, &UUID_PATTERN))?,
        ),
        text_column(
            "user_uuid",
            view.validated("user_uuid", |v| matches_pattern(v, &UUID_PATTERN))?,
        ),
        text_column("card_number", view.validated("card_number", card_number)?),
        text_column(
            "store_code",
            view.validated("store_code", |v| matches_pattern(v, &STORE_CODE_PATTERN))?,
        ),
        text_column(
            "product_code",
            view.validated("product_code", |v| matches_pattern(v, &PRODUCT_CODE_PATTERN))?,
        ),
        int_column("product_quantity", view.validated("product_quantity", parse_integer)?),
    ];

    finalise(Entity::Orders, columns, &[])
}
