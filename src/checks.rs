//! Type checkers
//!
//! One pure predicate per logical type. Each answers "can this raw text be
//! cast to the destination type without loss?". Empty cells never reach a
//! checker; nullability is decided by the row classifier.
//!
//! Decimal policy: plain positional notation only. `1e10`, `inf` and `nan`
//! are rejected because a DECIMAL cast on the destination rejects them.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{DecimalSpec, LogicalType, TemporalPattern};

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());

static DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:(?P<int>[0-9]+)(?:\.(?P<frac>[0-9]*))?|\.(?P<bare>[0-9]+))$").unwrap()
});

impl LogicalType {
    /// Run the checker for this type against a non-empty value
    pub fn accepts(&self, raw: &str) -> bool {
        match self {
            LogicalType::Integer => is_integer(raw),
            LogicalType::Decimal(spec) => is_decimal(raw, spec.as_ref()),
            LogicalType::Date(pattern) => is_date(raw, pattern),
            LogicalType::Timestamp(pattern) => is_timestamp(raw, pattern),
            LogicalType::Text(max_length) => is_text(raw, *max_length),
        }
    }
}

/// Optional sign followed by one or more ASCII digits
pub fn is_integer(raw: &str) -> bool {
    INTEGER.is_match(raw.trim())
}

/// Positional decimal, optionally bounded by DECIMAL(p, s)
///
/// Trailing fractional zeros and leading integer zeros do not count
/// against the bounds since dropping them loses nothing.
pub fn is_decimal(raw: &str, spec: Option<&DecimalSpec>) -> bool {
    let Some(caps) = DECIMAL.captures(raw.trim()) else {
        return false;
    };

    let Some(spec) = spec else {
        return true;
    };

    let int_part = caps.name("int").map_or("", |m| m.as_str());
    let frac_part = caps
        .name("frac")
        .or_else(|| caps.name("bare"))
        .map_or("", |m| m.as_str());

    let int_digits = int_part.trim_start_matches('0').len();
    let frac_digits = frac_part.trim_end_matches('0').len();

    frac_digits <= spec.scale as usize && int_digits <= spec.integer_digits() as usize
}

/// Exact match against the date pattern: same layout, a real calendar day
pub fn is_date(raw: &str, pattern: &TemporalPattern) -> bool {
    let raw = raw.trim();
    pattern.matches_shape(raw) && NaiveDate::parse_from_str(raw, pattern.strftime()).is_ok()
}

/// Exact match against the timestamp pattern: same layout, a real instant
pub fn is_timestamp(raw: &str, pattern: &TemporalPattern) -> bool {
    let raw = raw.trim();
    pattern.matches_shape(raw) && NaiveDateTime::parse_from_str(raw, pattern.strftime()).is_ok()
}

/// Any string is text; a maximum length is counted in characters
pub fn is_text(raw: &str, max_length: Option<usize>) -> bool {
    max_length.map_or(true, |max| raw.chars().count() <= max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(p: &str) -> TemporalPattern {
        TemporalPattern::parse(p).unwrap()
    }

    #[test]
    fn test_integer() {
        assert!(is_integer("42"));
        assert!(is_integer("-7"));
        assert!(is_integer("+007"));
        assert!(!is_integer("1.0"));
        assert!(!is_integer("1,000"));
        assert!(!is_integer("x"));
        assert!(!is_integer("-"));
        assert!(!is_integer("1 2"));
    }

    #[test]
    fn test_decimal() {
        assert!(is_decimal("3.14", None));
        assert!(is_decimal("-0.5", None));
        assert!(is_decimal(".5", None));
        assert!(is_decimal("10.", None));
        assert!(is_decimal("100", None));
        assert!(!is_decimal("1e10", None));
        assert!(!is_decimal("1.2.3", None));
        assert!(!is_decimal(".", None));
        assert!(!is_decimal("nan", None));
        assert!(!is_decimal("inf", None));
    }

    #[test]
    fn test_decimal_with_bounds() {
        let spec = DecimalSpec::new(5, 2).unwrap();
        assert!(is_decimal("123.45", Some(&spec)));
        assert!(is_decimal("00123.450", Some(&spec)));
        assert!(!is_decimal("1234.5", Some(&spec)));
        assert!(!is_decimal("1.234", Some(&spec)));
    }

    #[test]
    fn test_date() {
        let p = pattern("YYYY-MM-DD");
        assert!(is_date("2020-01-01", &p));
        assert!(is_date("2020-02-29", &p));
        assert!(!is_date("2021-02-29", &p));
        assert!(!is_date("2020-13-40", &p));
        assert!(!is_date("2020-01-01 10:00:00", &p));
        assert!(!is_date("2020-01", &p));
    }

    #[test]
    fn test_date_requires_exact_layout() {
        let p = pattern("YYYY-MM-DD");
        assert!(is_date("2020-1-1", &p));
        assert!(!is_date("0-1-1", &p));
        assert!(!is_date("20-01-01", &p));
        assert!(!is_date("02020-01-01", &p));
        assert!(!is_date("+2020-01-01", &p));
        assert!(!is_date("-2020-01-01", &p));
        assert!(!is_date("20200101", &p));
        assert!(!is_date("2020-001-01", &p));
    }

    #[test]
    fn test_timestamp() {
        let p = pattern("%Y-%m-%d %H:%M:%S");
        assert!(is_timestamp("2024-05-01 13:45:00", &p));
        assert!(!is_timestamp("2024-05-01", &p));
        assert!(!is_timestamp("2024-05-01 25:00:00", &p));
        assert!(!is_timestamp("2024-05-01 13:45:00Z", &p));
    }

    #[test]
    fn test_timestamp_requires_exact_layout() {
        let p = pattern("YYYY-MM-DD HH:mm:SS");
        assert!(is_timestamp("2020-01-01 10:00:00", &p));
        assert!(!is_timestamp("2020-01-0110:00:00", &p));
        assert!(!is_timestamp("20-01-01 10:00:00", &p));
        assert!(!is_timestamp("+2020-01-01 10:00:00", &p));
        assert!(!is_timestamp("2020-01-01 10:000:00", &p));
        assert!(!is_timestamp("2020-01-01T10:00:00", &p));
    }

    #[test]
    fn test_text() {
        assert!(is_text("anything at all", None));
        assert!(is_text("héllo", Some(5)));
        assert!(!is_text("héllo!", Some(5)));
    }

    #[test]
    fn test_dispatch_by_variant() {
        assert!(LogicalType::Integer.accepts("12"));
        assert!(!LogicalType::Integer.accepts("12.5"));
        assert!(LogicalType::Decimal(None).accepts("12.5"));
        assert!(LogicalType::Date(pattern("%Y-%m-%d")).accepts("1999-12-31"));
        assert!(LogicalType::Text(None).accepts("12.5"));
    }
}
