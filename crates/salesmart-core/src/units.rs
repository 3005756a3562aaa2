//! Product weight normalisation.
//!
//! Source weights are free text with mixed unit suffixes (`"1.6kg"`, `"500ml"`,
//! `"12oz"`, `"3 x 50g"`). Everything is converted to kilograms and rounded to
//! two decimals. The millilitre and ounce factors are the approximations used
//! for every historical load and must not be "corrected".

use crate::validators::{parse_float, round2};

const GRAMS_PER_KILOGRAM: f64 = 1000.0;
/// 1 ml is taken to weigh 1 g.
const MILLILITRES_PER_KILOGRAM: f64 = 1000.0;
const KILOGRAMS_PER_OUNCE: f64 = 0.0284;

const LIGHT_LIMIT_KG: f64 = 2.0;
const MID_SIZED_LIMIT_KG: f64 = 40.5;
const HEAVY_LIMIT_KG: f64 = 140.5;

pub fn to_kilograms(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();

    // Already canonical: a bare number is a kilogram value.
    if let Some(kilograms) = parse_float(trimmed) {
        return non_negative(kilograms);
    }

    // Anything after the first gram marker is noise ("77g .").
    let text = match trimmed.find('g') {
        Some(idx) => &trimmed[..=idx],
        None => trimmed,
    };

    let kilograms = if let Some(amount) = text.strip_suffix("kg") {
        parse_float(amount)?
    } else if text.contains('x') && text.ends_with('g') {
        multipack_grams(text)? / GRAMS_PER_KILOGRAM
    } else if let Some(amount) = text.strip_suffix('g') {
        parse_float(amount)? / GRAMS_PER_KILOGRAM
    } else if let Some(amount) = text.strip_suffix("ml") {
        parse_float(amount)? / MILLILITRES_PER_KILOGRAM
    } else if let Some(amount) = text.strip_suffix("oz") {
        parse_float(amount)? * KILOGRAMS_PER_OUNCE
    } else {
        return None;
    };

    non_negative(kilograms)
}

/// Weights below zero are corrupt rather than convertible.
fn non_negative(kilograms: f64) -> Option<f64> {
    (kilograms >= 0.0).then(|| round2(kilograms))
}

/// `"<count> x <grams>g"` total weight in grams.
fn multipack_grams(text: &str) -> Option<f64> {
    let (count, each) = text.strip_suffix('g')?.split_once('x')?;
    Some(parse_float(count)? * parse_float(each)?)
}

/// Shipping band used by downstream reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightClass {
    Light,
    MidSized,
    Heavy,
    TruckRequired,
}

impl WeightClass {
    pub fn from_kilograms(kilograms: f64) -> Self {
        if kilograms < LIGHT_LIMIT_KG {
            WeightClass::Light
        } else if kilograms < MID_SIZED_LIMIT_KG {
            WeightClass::MidSized
        } else if kilograms < HEAVY_LIMIT_KG {
            WeightClass::Heavy
        } else {
            WeightClass::TruckRequired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightClass::Light => "Light",
            WeightClass::MidSized => "Mid_Sized",
            WeightClass::Heavy => "Heavy",
            WeightClass::TruckRequired => "Truck_Required",
        }
    }
}
