use polars::prelude::DataFrame;

use super::table::{date_column, finalise, float_column, text_column, RawView};
use super::{CleanedTable, CleaningOptions};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::units::{to_kilograms, WeightClass};
use crate::validators::{
    ean, matches_pattern, one_of, parse_date, price, with_alias, DATE_FORMAT,
    PRODUCT_CODE_PATTERN, UUID_PATTERN,
};

pub const PRODUCT_CATEGORIES: &[&str] = &[
    "diy",
    "food-and-drink",
    "health-and-beauty",
    "homeware",
    "pets",
    "sports-and-leisure",
    "toys-and-games",
];

pub const AVAILABILITY: &[&str] = &["Still_available", "Removed"];

/// The product export spells the in-stock state `Still_avaliable`.
pub const AVAILABILITY_ALIASES: &[(&str, &str)] = &[("Still_avaliable", "Still_available")];

const COLUMNS: &[&str] = &[
    "product_name",
    "product_price",
    "weight",
    "category",
    "EAN",
    "date_added",
    "uuid",
    "removed",
    "product_code",
];

pub fn clean_products(raw: &DataFrame, _options: &CleaningOptions) -> Result<CleanedTable, CleaningError> {
    let view = RawView::new(Entity::Products, raw, COLUMNS)?;

    let weight = view.validated("weight", to_kilograms)?;
    let weight_class = weight
        .iter()
        .map(|kg| kg.map(|kg| WeightClass::from_kilograms(kg).as_str().to_string()))
        .collect();
    let date_added = view.validated("date_added", |v| parse_date(v, DATE_FORMAT))?;

    let columns = vec![
        text_column("product_name", view.text("product_name")?),
        float_column("product_price", view.validated("product_price", price)?),
        float_column("weight", weight),
        text_column("weight_class", weight_class),
        text_column(
            "category",
            view.validated("category", |v| one_of(v, PRODUCT_CATEGORIES))?,
        ),
        text_column("ean", view.validated("EAN", ean)?),
        date_column("date_added", &date_added)?,
        text_column("uuid", view.validated("uuid", |v| matches_pattern(v, &UUID_PATTERN))?),
        text_column(
            "removed",
            view.validated("removed", |v| with_alias(v, AVAILABILITY, AVAILABILITY_ALIASES))?,
        ),
        text_column(
            "product_code",
            view.validated("product_code", |v| matches_pattern(v, &PRODUCT_CODE_PATTERN))?,
        ),
    ];

    finalise(Entity::Products, columns, &[])
}
