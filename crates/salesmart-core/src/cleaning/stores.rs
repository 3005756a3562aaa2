use polars::prelude::DataFrame;

use super::table::{date_column, finalise, float_column, int_column, text_column, RawView};
use super::{CleanedTable, CleaningOptions, COUNTRY_CODES, COUNTRY_CODE_ALIASES};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::validators::{
    address, continent, locality, matches_pattern, one_of, parse_date, parse_float,
    parse_integer, with_alias, DATE_FORMAT, STORE_CODE_PATTERN,
};

pub const STORE_TYPES: &[&str] = &["Local", "Super Store", "Mall Kiosk", "Outlet", "Web Portal"];

pub const CONTINENTS: &[&str] = &["Europe", "America"];

const COLUMNS: &[&str] = &[
    "address",
    "longitude",
    "locality",
    "store_code",
    "staff_numbers",
    "opening_date",
    "store_type",
    "latitude",
    "country_code",
    "continent",
];

pub fn clean_stores(raw: &DataFrame, _options: &CleaningOptions) -> Result<CleanedTable, CleaningError> {
    let view = RawView::new(Entity::Stores, raw, COLUMNS)?;

    let opening_date = view.validated("opening_date", |v| parse_date(v, DATE_FORMAT))?;

    let columns = vec![
        text_column("address", view.validated("address", address)?),
        float_column("longitude", view.validated("longitude", parse_float)?),
        text_column("locality", view.validated("locality", locality)?),
        text_column(
            "store_code",
            view.validated("store_code", |v| matches_pattern(v, &STORE_CODE_PATTERN))?,
        ),
        int_column("staff_numbers", view.validated("staff_numbers", parse_integer)?),
        date_column("opening_date", &opening_date)?,
        text_column("store_type", view.validated("store_type", |v| one_of(v, STORE_TYPES))?),
        float_column("latitude", view.validated("latitude", parse_float)?),
        text_column(
            "country_code",
            view.validated("country_code", |v| {
                with_alias(v, COUNTRY_CODES, COUNTRY_CODE_ALIASES)
            })?,
        ),
        text_column("continent", view.validated("continent", |v| continent(v, CONTINENTS))?),
    ];

    finalise(Entity::Stores, columns, &[])
}
