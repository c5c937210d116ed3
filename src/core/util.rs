//! Date, money and list helpers shared by the importers

use crate::domain::LegacyId;
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Target timestamp format
pub const TARGET_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a legacy wall-clock timestamp in `tz` and convert it to UTC
///
/// Empty and zero dates (`0000-00-00...`) yield `None`.
pub fn parse_legacy_datetime(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("0000-00-00") {
        return None;
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    // Times inside a DST gap are shifted forward by the gap
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
}

pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.format(TARGET_DATETIME_FORMAT).to_string()
}

/// Resolve a timezone name, falling back to `fallback` and then UTC
pub fn resolve_timezone(name: Option<&str>, fallback: &str) -> Tz {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        match name.parse::<Tz>() {
            Ok(tz) => return tz,
            Err(_) => tracing::warn!(timezone = name, "Unknown legacy timezone, using fallback"),
        }
    }
    fallback.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = fallback, "Unknown fallback timezone, using UTC");
        Tz::UTC
    })
}

/// Money is carried with four decimal places
pub fn round_money(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Billing period of a price or service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
    Onetime,
}

impl Period {
    /// Lenient parse of legacy period names; unknown values are monthly
    pub fn parse(raw: &str) -> Period {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "days" | "daily" => Period::Day,
            "week" | "weeks" | "weekly" => Period::Week,
            "year" | "years" | "yearly" | "annually" => Period::Year,
            "onetime" | "one-time" | "once" | "free" => Period::Onetime,
            _ => Period::Month,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
            Period::Onetime => "onetime",
        }
    }

    /// Advance `date` by `term` of this period
    pub fn advance(&self, date: DateTime<Utc>, term: i64) -> Option<DateTime<Utc>> {
        let term = term.max(0);
        match self {
            Period::Day => date.checked_add_signed(Duration::try_days(term)?),
            Period::Week => date.checked_add_signed(Duration::try_weeks(term)?),
            Period::Month => date.checked_add_months(Months::new(u32::try_from(term).ok()?)),
            Period::Year => {
                date.checked_add_months(Months::new(u32::try_from(term.checked_mul(12)?).ok()?))
            }
            Period::Onetime => Some(date),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical form used to compare terms: years as months, weeks as days
///
/// Returns `None` when the converted term does not fit in an `i64`.
pub fn normalize_term(term: i64, period: Period) -> Option<(i64, Period)> {
    match period {
        Period::Year => Some((term.checked_mul(12)?, Period::Month)),
        Period::Week => Some((term.checked_mul(7)?, Period::Day)),
        Period::Onetime => Some((0, Period::Onetime)),
        other => Some((term, other)),
    }
}

/// Parse a legacy `term-price` list such as `"1-9.99,12-99.00"`
///
/// Terms are in months; malformed pairs are ignored.
pub fn parse_price_list(raw: &str) -> Vec<(i64, f64)> {
    raw.split(',')
        .filter_map(|pair| {
            let (term, price) = pair.trim().split_once('-')?;
            Some((term.trim().parse().ok()?, price.trim().parse().ok()?))
        })
        .collect()
}

/// Parse a comma-separated list of legacy ids, skipping blanks and zeros
pub fn parse_id_list(raw: &str) -> Vec<LegacyId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "0")
        .filter_map(|id| LegacyId::new(id).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_legacy_datetime_converts_to_utc() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let parsed = parse_legacy_datetime("2024-01-15 09:30:00", tz).unwrap();
        assert_eq!(format_datetime(parsed), "2024-01-15 14:30:00");
    }

    #[test_case("" ; "empty")]
    #[test_case("0000-00-00" ; "zero date")]
    #[test_case("0000-00-00 00:00:00" ; "zero datetime")]
    #[test_case("not a date" ; "garbage")]
    fn test_parse_legacy_datetime_none(raw: &str) {
        assert!(parse_legacy_datetime(raw, Tz::UTC).is_none());
    }

    #[test]
    fn test_parse_legacy_date_only_and_iso() {
        let date = parse_legacy_datetime("2024-03-01", Tz::UTC).unwrap();
        assert_eq!(format_datetime(date), "2024-03-01 00:00:00");
        let iso = parse_legacy_datetime("2024-03-01T08:00:00", Tz::UTC).unwrap();
        assert_eq!(format_datetime(iso), "2024-03-01 08:00:00");
    }

    #[test]
    fn test_resolve_timezone_fallbacks() {
        assert_eq!(resolve_timezone(Some("Europe/Dublin"), "UTC"), Tz::Europe__Dublin);
        assert_eq!(resolve_timezone(Some("Nowhere/City"), "Asia/Tokyo"), Tz::Asia__Tokyo);
        assert_eq!(resolve_timezone(None, "bogus"), Tz::UTC);
    }

    #[test_case(Period::Month, 1, "2024-01-31 00:00:00", "2024-02-29 00:00:00" ; "month clamps")]
    #[test_case(Period::Year, 1, "2024-02-29 00:00:00", "2025-02-28 00:00:00" ; "year")]
    #[test_case(Period::Week, 2, "2024-01-01 00:00:00", "2024-01-15 00:00:00" ; "weeks")]
    #[test_case(Period::Day, 10, "2024-01-01 00:00:00", "2024-01-11 00:00:00" ; "days")]
    fn test_period_advance(period: Period, term: i64, from: &str, expected: &str) {
        let start = parse_legacy_datetime(from, Tz::UTC).unwrap();
        assert_eq!(format_datetime(period.advance(start, term).unwrap()), expected);
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term(1, Period::Year), normalize_term(12, Period::Month));
        assert_eq!(normalize_term(3, Period::Onetime), Some((0, Period::Onetime)));
    }

    #[test_case(i64::MAX / 2, Period::Year ; "years")]
    #[test_case(i64::MAX / 2, Period::Week ; "weeks")]
    fn test_normalize_term_overflow(term: i64, period: Period) {
        assert_eq!(normalize_term(term, period), None);
    }

    #[test_case(Period::Day, 999_999_999_999_999 ; "days")]
    #[test_case(Period::Week, 999_999_999_999_999 ; "weeks")]
    #[test_case(Period::Month, i64::MAX ; "months")]
    #[test_case(Period::Year, i64::MAX / 2 ; "years")]
    fn test_period_advance_out_of_range(period: Period, term: i64) {
        let start = parse_legacy_datetime("2024-01-01 00:00:00", Tz::UTC).unwrap();
        assert_eq!(period.advance(start, term), None);
    }

    #[test]
    fn test_parse_price_list() {
        assert_eq!(
            parse_price_list("1-9.99, 12-99.00,bad,3-"),
            vec![(1, 9.99), (12, 99.0)]
        );
    }

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list("3, 0,,7");
        assert_eq!(ids, vec![LegacyId::from(3), LegacyId::from(7)]);
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(1.234_56), 1.2346);
    }
}
