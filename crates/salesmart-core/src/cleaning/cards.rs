use std::ops::RangeInclusive;

use polars::prelude::DataFrame;

use super::table::{date_column, finalise, text_column, RawView};
use super::{CleanedTable, CleaningOptions};
use crate::entities::Entity;
use crate::error::CleaningError;
use crate::validators::{card_number, one_of, parse_date, parse_expiry, DATE_FORMAT};

/// Card number lengths accepted per provider, as named in the card document.
pub const CARD_PROVIDER_LENGTHS: &[(&str, RangeInclusive<usize>)] = &[
    ("American Express", 15..=15),
    ("Diners Club / Carte Blanche", 14..=14),
    ("Discover", 16..=16),
    ("JCB 15 digit", 15..=15),
    ("JCB 16 digit", 16..=16),
    ("Maestro", 12..=19),
    ("Mastercard", 16..=16),
    ("VISA 13 digit", 13..=13),
    ("VISA 16 digit", 16..=16),
    ("VISA 19 digit", 19..=19),
];

const COLUMNS: &[&str] = &[
    "card_number",
    "expiry_date",
    "card_provider",
    "date_payment_confirmed",
];

pub fn accepted_card_lengths(provider: &str) -> Option<&'static RangeInclusive<usize>> {
    CARD_PROVIDER_LENGTHS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, lengths)| lengths)
}

pub fn clean_cards(raw: &DataFrame, _options: &CleaningOptions) -> Result<CleanedTable, CleaningError> {
    let view = RawView::new(Entity::Cards, raw, COLUMNS)?;

    let providers: Vec<&str> = CARD_PROVIDER_LENGTHS.iter().map(|(name, _)| *name).collect();
    let card_provider = view.validated("card_provider", |v| one_of(v, &providers))?;

    // The length check needs a known provider, so it runs after the provider rule.
    let numbers = view
        .validated("card_number", card_number)?
        .into_iter()
        .zip(card_provider.iter())
        .map(|(number, provider)| {
            let lengths = accepted_card_lengths(provider.as_deref()?)?;
            number.filter(|digits| lengths.contains(&digits.len()))
        })
        .collect();

    let expiry_date = view.validated("expiry_date", parse_expiry)?;
    let confirmed = view.validated("date_payment_confirmed", |v| parse_date(v, DATE_FORMAT))?;

    let columns = vec![
        text_column("card_number", numbers),
        date_column("expiry_date", &expiry_date)?,
        text_column("card_provider", card_provider),
        date_column("date_payment_confirmed", &confirmed)?,
    ];

    finalise(Entity::Cards, columns, &[])
}
