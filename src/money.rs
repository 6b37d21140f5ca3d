//! Money helpers backed by `rust_decimal`.
//!
//! Form fields arrive as raw text. Anything that does not parse is coerced
//! instead of rejected, so the caller can always render a total.

use rust_decimal::prelude::*;
use std::str::FromStr;

/// Display precision for monetary values (2 decimal places, half-up)
pub const DECIMAL_PLACES: u32 = 2;

/// Round a monetary value for display.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a money field. Empty, non-numeric, non-finite or negative input is 0.
///
/// A leading currency symbol and thousands separators are ignored, so both
/// `"150"` and `"$1,150.00"` are accepted.
pub fn parse_money(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '-' && c != '.')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    match Decimal::from_str(&cleaned) {
        Ok(value) if value.is_sign_negative() => Decimal::ZERO,
        Ok(value) => value,
        Err(_) => Decimal::ZERO,
    }
}

/// Convert a float coming from a JSON payload. NaN, infinities and negatives are 0.
pub fn money_from_f64(value: f64) -> Decimal {
    if !value.is_finite() || value < 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or_default()
}

/// Read the integer at the start of `raw`, ignoring whatever follows it, so
/// `"2.5"` reads as 2 and `"3 units"` as 3. Leading whitespace and one sign
/// are accepted. Returns `None` when no digit follows. Out-of-range values
/// saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: i64 = 0;
    let mut seen = false;
    for digit in digits {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(digit - b'0'));
    }

    match (seen, negative) {
        (false, _) => None,
        (true, true) => Some(-value),
        (true, false) => Some(value),
    }
}

/// Parse an add-on quantity from its leading integer. Anything without a
/// positive leading integer is 1.
pub fn parse_quantity(raw: &str) -> u32 {
    match leading_integer(raw) {
        Some(q) if q > 0 => u32::try_from(q).unwrap_or(u32::MAX),
        _ => 1,
    }
}

/// Parse a head count (attendees, capacity) from its leading integer.
/// Anything unparsable or negative is 0.
pub fn parse_count(raw: &str) -> u32 {
    match leading_integer(raw) {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 0,
    }
}

/// Format an amount the way the booking screens show it: `$1,234.50`, `-$150.00`.
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let rounded = round_money(amount);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let fixed = format!("{:.2}", rounded.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{symbol}{grouped}.{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_is_lenient() {
        assert_eq!(parse_money("150"), Decimal::from(150));
        assert_eq!(parse_money(" $1,150.50 "), Decimal::new(115050, 2));
        assert_eq!(parse_money(""), Decimal::ZERO);
        assert_eq!(parse_money("abc"), Decimal::ZERO);
        assert_eq!(parse_money("-20"), Decimal::ZERO);
    }

    #[test]
    fn test_money_from_f64_rejects_non_finite() {
        assert_eq!(money_from_f64(f64::NAN), Decimal::ZERO);
        assert_eq!(money_from_f64(f64::INFINITY), Decimal::ZERO);
        assert_eq!(money_from_f64(-3.0), Decimal::ZERO);
        assert_eq!(money_from_f64(12.5), Decimal::new(125, 1));
    }

    #[test]
    fn test_parse_quantity_defaults_to_one() {
        assert_eq!(parse_quantity("3"), 3);
        assert_eq!(parse_quantity(""), 1);
        assert_eq!(parse_quantity("two"), 1);
        assert_eq!(parse_quantity("0"), 1);
        assert_eq!(parse_quantity("-4"), 1);
    }

    #[test]
    fn test_parse_quantity_reads_leading_digits() {
        assert_eq!(parse_quantity("2.5"), 2);
        assert_eq!(parse_quantity("3 units"), 3);
        assert_eq!(parse_quantity(" +7"), 7);
        assert_eq!(parse_quantity("0.9"), 1);
        assert_eq!(parse_quantity("x3"), 1);
        assert_eq!(parse_quantity("99999999999999999999999"), u32::MAX);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("25"), 25);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-1"), 0);
        assert_eq!(parse_count("12 people"), 12);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Decimal::new(123450, 2), "$"), "$1,234.50");
        assert_eq!(format_currency(Decimal::from(-150), "$"), "-$150.00");
        assert_eq!(format_currency(Decimal::ZERO, "$"), "$0.00");
        assert_eq!(format_currency(Decimal::new(1005, 3), "$"), "$1.01");
        assert_eq!(format_currency(Decimal::from(1_000_000), "€"), "€1,000,000.00");
    }
}
