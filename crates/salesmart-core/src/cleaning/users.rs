use polars::prelude::DataFrame;

use super::table::{date_column, finalise, text_column, RawView};
use super::{CleanedTable, CleaningOptions, COUNTRY_CODES, COUNTRY_CODE_ALIASES};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::validators::{
    matches_pattern, one_of, parse_date, phone_digits, with_alias, DATE_FORMAT, UUID_PATTERN,
};

pub const COUNTRIES: &[&str] = &["United Kingdom", "United States", "Germany"];

const COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "date_of_birth",
    "company",
    "email_address",
    "address",
    "country",
    "country_code",
    "phone_number",
    "join_date",
    "user_uuid",
];

pub fn clean_users(raw: &DataFrame, _options: &CleaningOptions) -> Result<CleanedTable, CleaningError> {
    let view = RawView::new(Entity::Users, raw, COLUMNS)?;

    let date_of_birth = view.validated("date_of_birth", |v| parse_date(v, DATE_FORMAT))?;
    let join_date = view.validated("join_date", |v| parse_date(v, DATE_FORMAT))?;

    let columns = vec![
        text_column("first_name", view.text("first_name")?),
        text_column("last_name", view.text("last_name")?),
        date_column("date_of_birth", &date_of_birth)?,
        text_column("company", view.text("company")?),
        text_column("email_address", view.text("email_address")?),
        text_column("address", view.text("address")?),
        text_column("country", view.validated("country", |v| one_of(v, COUNTRIES))?),
        text_column(
            "country_code",
            view.validated("country_code", |v| {
                with_alias(v, COUNTRY_CODES, COUNTRY_CODE_ALIASES)
            })?,
        ),
        text_column("phone_number", view.validated("phone_number", phone_digits)?),
        date_column("join_date", &join_date)?,
        text_column(
            "user_uuid",
            view.validated("user_uuid", |v| matches_pattern(v, &UUID_PATTERN))?,
        ),
    ];

    finalise(Entity::Users, columns, &["email_address"])
}
