//! Numeric ticker fields: the sortable column keys and the fixed-precision
//! price cell they point at.

use std::fmt;

use clap::ValueEnum;
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Marker rendered for cells that did not hold a usable number.
pub const NOT_A_NUMBER: &str = "---";

/// Numeric column a table can be ordered by.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    ValueEnum,
    Display,
    EnumString,
    Hash,
    Eq,
    PartialEq,
)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum SortKey {
    /// Best bid.
    Bid,
    /// Best ask.
    Ask,
    /// Session high.
    High,
    /// Session low.
    Low,
    /// Last traded price.
    #[default]
    Last,
}

impl SortKey {
    /// Every column in display order.
    pub const ALL: [SortKey; 5] = [
        SortKey::Bid,
        SortKey::Ask,
        SortKey::High,
        SortKey::Low,
        SortKey::Last,
    ];

    /// Field name as it appears in ticker params on the wire.
    pub fn field_name(self) -> &'static str {
        match self {
            SortKey::Bid => "bid",
            SortKey::Ask => "ask",
            SortKey::High => "high",
            SortKey::Low => "low",
            SortKey::Last => "last",
        }
    }
}

/// A price normalized to two decimals, or the not-a-number marker when the
/// incoming value could not be read as a finite number.
#[derive(Debug, Clone, PartialEq)]
pub enum Price {
    /// Two-decimal text, e.g. `"10.00"`.
    Fixed(String),
    /// The source value was missing or not numeric.
    NotANumber,
}

impl Price {
    /// Normalizes a finite float to two decimals.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Price::NotANumber;
        }
        // -0.0 would otherwise render as "-0.00"
        let value = if value == 0.0 { 0.0 } else { value };
        Price::Fixed(format!("{:.2}", round_half_cent_away(value)))
    }

    /// Coerces a raw JSON field (number or numeric text) into a price.
    ///
    /// Strings are read by their leading float, so `"3.5abc"` becomes `3.50`.
    /// Anything else, including a missing field, is not a number.
    pub fn from_json(value: Option<&Value>) -> Self {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => parse_float_prefix(s),
            _ => None,
        };
        parsed.map(Price::from_f64).unwrap_or(Price::NotANumber)
    }

    /// Numeric value of the fixed text, `None` for the not-a-number marker.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Price::Fixed(text) => text.parse().ok(),
            Price::NotANumber => None,
        }
    }

    /// Returns `true` for the not-a-number marker.
    pub fn is_nan(&self) -> bool {
        matches!(self, Price::NotANumber)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Fixed(text) => f.write_str(text),
            Price::NotANumber => f.write_str(NOT_A_NUMBER),
        }
    }
}

/// `{:.2}` rounds exact half-cent ties to even; ties here go away from zero.
///
/// A finite f64 sits exactly on a half cent only when it is an odd number of
/// eighths (`x.125`, `x.375`, `x.625`, `x.875`), and scaling by 8 is exact.
fn round_half_cent_away(value: f64) -> f64 {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths.rem_euclid(2.0) == 1.0 {
        (value.abs() * 100.0 + 0.5).floor().copysign(value) / 100.0
    } else {
        value
    }
}

/// Parses the longest leading decimal literal of `raw` after leading
/// whitespace: optional sign, digits with an optional fraction, and an
/// optional exponent that is only consumed when it carries digits.
fn parse_float_prefix(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_key_parses_case_insensitive() {
        assert_eq!("BID".parse::<SortKey>().unwrap(), SortKey::Bid);
        assert_eq!("last".parse::<SortKey>().unwrap(), SortKey::Last);
        assert!("volume".parse::<SortKey>().is_err());
    }

    #[test]
    fn sort_key_display_matches_field_name() {
        for key in SortKey::ALL {
            assert_eq!(key.to_string(), key.field_name());
        }
    }

    #[test]
    fn price_from_number_and_text() {
        assert_eq!(Price::from_json(Some(&json!(10))), Price::Fixed("10.00".into()));
        assert_eq!(Price::from_json(Some(&json!("0.123456"))), Price::Fixed("0.12".into()));
        assert_eq!(Price::from_json(Some(&json!(" 3.5abc"))), Price::Fixed("3.50".into()));
        assert_eq!(Price::from_json(Some(&json!("-.5"))), Price::Fixed("-0.50".into()));
        assert_eq!(Price::from_json(Some(&json!("1e3x"))), Price::Fixed("1000.00".into()));
        assert_eq!(Price::from_json(Some(&json!("2e"))), Price::Fixed("2.00".into()));
    }

    #[test]
    fn price_falls_back_to_not_a_number() {
        assert!(Price::from_json(None).is_nan());
        assert!(Price::from_json(Some(&Value::Null)).is_nan());
        assert!(Price::from_json(Some(&json!("abc"))).is_nan());
        assert!(Price::from_json(Some(&json!("."))).is_nan());
        assert!(Price::from_json(Some(&json!(true))).is_nan());
        assert!(Price::from_f64(f64::INFINITY).is_nan());
        assert_eq!(Price::NotANumber.to_string(), NOT_A_NUMBER);
    }

    #[test]
    fn half_cent_ties_round_away_from_zero() {
        assert_eq!(Price::from_f64(0.125).to_string(), "0.13");
        assert_eq!(Price::from_f64(1.125).to_string(), "1.13");
        assert_eq!(Price::from_f64(-0.125).to_string(), "-0.13");
        assert_eq!(Price::from_f64(0.375).to_string(), "0.38");
        assert_eq!(Price::from_json(Some(&json!("0.625"))).to_string(), "0.63");
        assert_eq!(Price::from_f64(2.675).to_string(), "2.67");
        assert_eq!(Price::from_f64(1.005).to_string(), "1.00");
        assert_eq!(Price::from_f64(0.5).to_string(), "0.50");
    }

    #[test]
    fn negative_zero_renders_unsigned() {
        assert_eq!(Price::from_f64(-0.0).to_string(), "0.00");
    }

    #[test]
    fn fixed_text_reads_back_as_number() {
        assert_eq!(Price::from_f64(5.0).as_f64(), Some(5.0));
        assert_eq!(Price::NotANumber.as_f64(), None);
    }
}
