//! Per-entity cleaners. Each one reads the raw string table, runs every field
//! through its rule, and hands the typed columns to [`table::finalise`] for
//! row-level cleanup.

use std::ops::RangeInclusive;

use polars::prelude::DataFrame;
use serde::Serialize;

use crate::entities::Entity;

mod cards;
mod date_times;
mod orders;
mod products;
mod stores;
pub mod table;
mod users;

pub use cards::{accepted_card_lengths, clean_cards, CARD_PROVIDER_LENGTHS};
pub use date_times::{clean_date_times, TIME_PERIODS};
pub use orders::clean_orders;
pub use products::{clean_products, AVAILABILITY, AVAILABILITY_ALIASES, PRODUCT_CATEGORIES};
pub use stores::{clean_stores, CONTINENTS, STORE_TYPES};
pub use users::{clean_users, COUNTRIES};

pub const COUNTRY_CODES: &[&str] = &["GB", "US", "DE"];

/// `GGB` appears for British rows in both the legacy users table and the store API.
pub const COUNTRY_CODE_ALIASES: &[(&str, &str)] = &[("GGB", "GB")];

pub const DEFAULT_YEAR_RANGE: RangeInclusive<i64> = 1980..=2022;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningOptions {
    /// Years accepted by the date dimension.
    pub year_range: RangeInclusive<i64>,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            year_range: DEFAULT_YEAR_RANGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub entity: Entity,
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped_missing: usize,
    pub rows_dropped_duplicate: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub df: DataFrame,
    pub report: CleaningReport,
}

impl CleanedTable {
    pub fn into_dataframe(self) -> DataFrame {
        self.df
    }
}
