use polars::prelude::DataFrame;

use super::table::{finalise, int_column, text_column, time_column, RawView};
use super::{CleanedTable, CleaningOptions};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::validators::{integer_in_range, matches_pattern, one_of, parse_time, TIME_FORMAT, UUID_PATTERN};

pub const TIME_PERIODS: &[&str] = &["Morning", "Midday", "Evening", "Late_Hours"];

const COLUMNS: &[&str] = &["timestamp", "month", "year", "day", "time_period", "date_uuid"];

pub fn clean_date_times(raw: &DataFrame, options: &CleaningOptions) -> Result<CleanedTable, CleaningError> {
    let view = RawView::new(Entity::DateTimes, raw, COLUMNS)?;

    let timestamp = view.validated("timestamp", |v| parse_time(v, TIME_FORMAT))?;

    let columns = vec![
        time_column("timestamp", &timestamp)?,
        int_column("month", view.validated("month", |v| integer_in_range(v, &(1..=12)))?),
        int_column(
            "year",
            view.validated("year", |v| integer_in_range(v, &options.year_range))?,
        ),
        int_column("day", view.validated("day", |v| integer_in_range(v, &(1..=31)))?),
        text_column(
            "time_period",
            view.validated("time_period", |v| one_of(v, TIME_PERIODS))?,
        ),
        text_column(
            "date_uuid",
            view.validated("date_uuid", |v| matches_pattern(v, &UUID_PATTERN))?,
        ),
    ];

    finalise(Entity::DateTimes, columns, &[])
}
