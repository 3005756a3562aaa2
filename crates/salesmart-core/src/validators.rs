//! Scalar field rules. Every function here is total: a value that fails its
//! rule comes back as `None` and is dealt with later at row level.

use std::ops::RangeInclusive;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder the legacy sources write in place of an empty cell.
pub const NULL_TOKEN: &str = "NULL";

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const EXPIRY_FORMAT: &str = "%m/%y";
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern compiles")
});

pub static STORE_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,3}-[A-Z0-9]{8}$").expect("store code pattern compiles"));

pub static PRODUCT_CODE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]{2}-[0-9]{6,7}[a-zA-Z]$").expect("product code pattern compiles")
});

/// Currency markers that may prefix a price. `Â` is what a UTF-8 `£` turns
/// into after a Latin-1 round trip.
const CURRENCY_PREFIXES: [char; 4] = ['£', '$', '€', 'Â'];

const PHONE_DIGITS: usize = 10;
const CARD_DIGITS: RangeInclusive<usize> = 12..=19;
const EAN_DIGITS: RangeInclusive<usize> = 12..=13;

/// Maps the null placeholder and empty cells to missing.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != NULL_TOKEN)
}

pub fn one_of(value: &str, allowed: &[&str]) -> Option<String> {
    allowed
        .iter()
        .any(|candidate| *candidate == value)
        .then(|| value.to_string())
}

/// Like [`one_of`], but a known misspelling is rewritten to its canonical
/// member instead of being rejected.
pub fn with_alias(
    value: &str,
    allowed: &[&str],
    aliases: &[(&str, &str)],
) -> Option<String> {
    one_of(value, allowed).or_else(|| {
        aliases
            .iter()
            .find(|(alias, _)| *alias == value)
            .map(|(_, canonical)| (*canonical).to_string())
    })
}

pub fn matches_pattern(value: &str, pattern: &Regex) -> Option<String> {
    pattern.is_match(value).then(|| value.to_string())
}

pub fn parse_float(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Accepts `"12"` and integral floats such as `"12.0"`.
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }

    let parsed = parse_float(trimmed)?;
    if parsed.fract() != 0.0 || parsed < i64::MIN as f64 || parsed > i64::MAX as f64 {
        return None;
    }
    Some(parsed as i64)
}

pub fn integer_in_range(value: &str, range: &RangeInclusive<i64>) -> Option<i64> {
    parse_integer(value).filter(|parsed| range.contains(parsed))
}

/// Parses against exactly one layout; anything else is rejected rather than reinterpreted.
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, format).ok()
}

/// `MM/YY` card expiry, anchored to the first day of the month.
pub fn parse_expiry(value: &str) -> Option<NaiveDate> {
    let anchored = format!("{value} 01");
    let format = format!("{EXPIRY_FORMAT} %d");
    NaiveDate::parse_from_str(&anchored, &format).ok()
}

pub fn parse_time(value: &str, format: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, format).ok()
}

/// Keeps the last ten digits of a phone number with leading zeros removed.
pub fn phone_digits(value: &str) -> Option<String> {
    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
    let start = digits.len().saturating_sub(PHONE_DIGITS);
    let tail: String = digits[start..].iter().collect();
    let trimmed = tail.trim_start_matches('0');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Card identifier rule shared by the card dimension and the orders fact.
/// `?` characters left by the document conversion and whitespace are removed;
/// what remains must be 12 to 19 digits.
pub fn card_number(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '?' && !c.is_whitespace())
        .collect();
    let all_digits = !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit());
    (all_digits && CARD_DIGITS.contains(&cleaned.len())).then_some(cleaned)
}

pub fn ean(value: &str) -> Option<String> {
    let all_digits = value.chars().all(|c| c.is_ascii_digit());
    (all_digits && EAN_DIGITS.contains(&value.len())).then(|| value.to_string())
}

/// Strips a currency prefix and parses the amount. Letters anywhere else void the price.
pub fn price(value: &str) -> Option<f64> {
    if value.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let amount = value.trim().trim_start_matches(CURRENCY_PREFIXES);
    parse_float(amount)
        .filter(|amount| *amount >= 0.0)
        .map(round2)
}

/// Exact member of the continent set, or the first member found as a substring
/// (the store API prefixes some values with noise such as `eeEurope`).
pub fn continent(value: &str, allowed: &[&str]) -> Option<String> {
    one_of(value, allowed).or_else(|| {
        allowed
            .iter()
            .find(|candidate| value.contains(*candidate))
            .map(|candidate| (*candidate).to_string())
    })
}

/// Locality names never contain digits.
pub fn locality(value: &str) -> Option<String> {
    (!value.chars().any(|c| c.is_ascii_digit())).then(|| value.to_string())
}

/// A postal address has more than one word.
pub fn address(value: &str) -> Option<String> {
    (value.split_whitespace().count() > 1).then(|| value.to_string())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_drops_placeholders() {
        assert_eq!(present(Some("NULL")), None);
        assert_eq!(present(Some("")), None);
        assert_eq!(present(None), None);
        assert_eq!(present(Some("null")), Some("null"));
    }

    #[test]
    fn alias_rewrites_known_misspelling_only() {
        let codes = ["GB", "US", "DE"];
        let aliases = [("GGB", "GB")];
        assert_eq!(with_alias("GGB", &codes, &aliases).as_deref(), Some("GB"));
        assert_eq!(with_alias("DE", &codes, &aliases).as_deref(), Some("DE"));
        assert_eq!(with_alias("GBB", &codes, &aliases), None);
        assert_eq!(with_alias("gb", &codes, &aliases), None);
    }

    #[test]
    fn uuid_pattern_is_stable_under_revalidation() {
        let accepted = matches_pattern("93caf182-e4e9-4c6e-bebb-60a1a9dcf9b8", &UUID_PATTERN)
            .expect("valid uuid");
        assert_eq!(
            matches_pattern(&accepted, &UUID_PATTERN).as_deref(),
            Some(accepted.as_str())
        );
        assert_eq!(matches_pattern("93caf182e4e94c6ebebb60a1a9dcf9b8", &UUID_PATTERN), None);
        assert_eq!(matches_pattern("NULL", &UUID_PATTERN), None);
    }

    #[test]
    fn code_patterns() {
        assert!(matches_pattern("WEB-1388012W", &STORE_CODE_PATTERN).is_some());
        assert!(matches_pattern("HI-9B97EE4E", &STORE_CODE_PATTERN).is_some());
        assert!(matches_pattern("hi-9B97EE4E", &STORE_CODE_PATTERN).is_none());
        assert!(matches_pattern("HI-9B97EE4", &STORE_CODE_PATTERN).is_none());

        assert!(matches_pattern("R7-3126933h", &PRODUCT_CODE_PATTERN).is_some());
        assert!(matches_pattern("fd-123456x", &PRODUCT_CODE_PATTERN).is_some());
        assert!(matches_pattern("R7-31269331", &PRODUCT_CODE_PATTERN).is_none());
    }

    #[test]
    fn numeric_coercion_never_panics() {
        assert_eq!(parse_float(" 51.62907 "), Some(51.62907));
        assert_eq!(parse_float("N/A"), None);
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_integer("34"), Some(34));
        assert_eq!(parse_integer("34.0"), Some(34));
        assert_eq!(parse_integer("34.5"), None);
        assert_eq!(parse_integer("J78"), None);
        assert_eq!(parse_integer("30e"), None);
    }

    #[test]
    fn integer_range_is_inclusive() {
        let months = 1..=12;
        assert_eq!(integer_in_range("1", &months), Some(1));
        assert_eq!(integer_in_range("12", &months), Some(12));
        assert_eq!(integer_in_range("13", &months), None);
        assert_eq!(integer_in_range("0", &months), None);
        assert_eq!(integer_in_range("May", &months), None);
    }

    #[test]
    fn dates_parse_against_a_single_layout() {
        assert_eq!(
            parse_date("2015-02-20", DATE_FORMAT),
            NaiveDate::from_ymd_opt(2015, 2, 20)
        );
        assert_eq!(parse_date("2015-13-45", DATE_FORMAT), None);
        assert_eq!(parse_date("2015/02/20", DATE_FORMAT), None);
        assert_eq!(parse_date("February 2015 20", DATE_FORMAT), None);
    }

    #[test]
    fn expiry_is_month_and_two_digit_year() {
        assert_eq!(parse_expiry("09/26"), NaiveDate::from_ymd_opt(2026, 9, 1));
        assert_eq!(parse_expiry("13/24"), None);
        assert_eq!(parse_expiry("2026-09"), None);
    }

    #[test]
    fn times_parse_strictly() {
        assert_eq!(
            parse_time("22:00:06", TIME_FORMAT),
            NaiveTime::from_hms_opt(22, 0, 6)
        );
        assert_eq!(parse_time("25:01:00", TIME_FORMAT), None);
        assert_eq!(parse_time("22:00", TIME_FORMAT), None);
    }

    #[test]
    fn phone_numbers_keep_last_ten_digits() {
        assert_eq!(phone_digits("(0161) 496 0674").as_deref(), Some("1614960674"));
        assert_eq!(phone_digits("+49(0) 047905356").as_deref(), Some("47905356"));
        assert_eq!(phone_digits("+1-202-555-0147").as_deref(), Some("2025550147"));
        assert_eq!(phone_digits("000").as_deref(), None);
        assert_eq!(phone_digits("call me").as_deref(), None);
    }

    #[test]
    fn card_numbers_drop_conversion_artefacts() {
        assert_eq!(
            card_number("???4971858637664481").as_deref(),
            Some("4971858637664481")
        );
        assert_eq!(card_number("VAB9DSB8ZM"), None);
        assert_eq!(card_number("12345678901"), None);
        assert_eq!(card_number("12345678901234567890"), None);
        assert_eq!(card_number("676307659583").as_deref(), Some("676307659583"));
    }

    #[test]
    fn ean_requires_twelve_or_thirteen_digits() {
        assert!(ean("7425710935115").is_some());
        assert!(ean("742571093511").is_some());
        assert!(ean("74257109351").is_none());
        assert!(ean("ABC123456789").is_none());
    }

    #[test]
    fn prices_strip_currency_prefix() {
        assert_eq!(price("£39.99"), Some(39.99));
        assert_eq!(price("Â£9.991"), Some(9.99));
        assert_eq!(price("12"), Some(12.0));
        assert_eq!(price("CCAVRB79VV"), None);
        assert_eq!(price("£12.99p"), None);
        assert_eq!(price("£-5"), None);
        assert_eq!(price("-0.50"), None);
    }

    #[test]
    fn continent_matches_by_substring() {
        let continents = ["Europe", "America"];
        assert_eq!(continent("Europe", &continents).as_deref(), Some("Europe"));
        assert_eq!(continent("eeEurope", &continents).as_deref(), Some("Europe"));
        assert_eq!(continent("eeAmerica", &continents).as_deref(), Some("America"));
        assert_eq!(continent("Asia", &continents), None);
    }

    #[test]
    fn locality_and_address_rules() {
        assert!(locality("High Wycombe").is_some());
        assert!(locality("Exeter1").is_none());
        assert!(address("1 Oak Lane").is_some());
        assert!(address("N/A").is_none());
    }
}
