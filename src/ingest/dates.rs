//! Tolerant date parsing for hand-curated date columns.

use crate::models::RecordDate;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

const DAY_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const PLACEHOLDERS: &[&str] = &["nan", "nat", "null", "none", "n/a", "unknown", "-", "?"];

/// Years a full date may carry; `%Y` accepts any digit count, so `22` would
/// otherwise parse as year 0022.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2099;

/// True for empty cells and the usual spreadsheet stand-ins for "no value".
pub(crate) fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str())
}

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    YEAR_RANGE.contains(&date.year()).then_some(date)
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // 4-digit year not embedded in a longer number
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:^|\D)(19\d{2}|20\d{2})(?:\D|$)").expect("year pattern is valid")
    })
}

/// Parse a date cell.
///
/// Full dates in the common layouts become [`RecordDate::Day`]; anything
/// else containing a plausible year becomes [`RecordDate::Year`]. Empty
/// cells and placeholders are unknown, other text is malformed.
pub fn parse_date(text: &str) -> RecordDate {
    let trimmed = text.trim();

    if is_placeholder(trimmed) {
        return RecordDate::Unknown;
    }

    let day = DAY_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .find_map(plausible)
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .and_then(|timestamp| plausible(timestamp.date_naive()))
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .filter_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .find_map(|timestamp| plausible(timestamp.date()))
        });
    if let Some(date) = day {
        return RecordDate::Day(date);
    }

    match year_pattern()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
    {
        Some(year) => RecordDate::Year(year),
        None => RecordDate::Malformed(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> RecordDate {
        RecordDate::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_parse_full_dates() {
        assert_eq!(parse_date("2022-02-24"), day(2022, 2, 24));
        assert_eq!(parse_date("24.02.2022"), day(2022, 2, 24));
        assert_eq!(parse_date("24/02/2022"), day(2022, 2, 24));
        assert_eq!(parse_date("2022-11-11T00:00:00"), day(2022, 11, 11));
        assert_eq!(parse_date("2022-11-11T10:30:00+02:00"), day(2022, 11, 11));
    }

    #[test]
    fn test_parse_years_from_text() {
        assert_eq!(parse_date("2014"), RecordDate::Year(2014));
        assert_eq!(parse_date("2014.0"), RecordDate::Year(2014));
        assert_eq!(parse_date("autumn 2022"), RecordDate::Year(2022));
        assert_eq!(parse_date("2014-2015"), RecordDate::Year(2014));
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert_eq!(parse_date(""), RecordDate::Unknown);
        assert_eq!(parse_date("  NaN "), RecordDate::Unknown);
        assert_eq!(parse_date("unknown"), RecordDate::Unknown);
        assert_eq!(
            parse_date("during occupation"),
            RecordDate::Malformed("during occupation".to_string())
        );
        assert_eq!(
            parse_date("120145"),
            RecordDate::Malformed("120145".to_string())
        );
    }

    #[test]
    fn test_two_digit_years_are_not_full_dates() {
        assert_eq!(
            parse_date("01.03.22"),
            RecordDate::Malformed("01.03.22".to_string())
        );
        assert_eq!(
            parse_date("24/02/22"),
            RecordDate::Malformed("24/02/22".to_string())
        );
        assert_eq!(
            parse_date("0022-03-01"),
            RecordDate::Malformed("0022-03-01".to_string())
        );
        assert_eq!(
            parse_date("01.01.1850"),
            RecordDate::Malformed("01.01.1850".to_string())
        );
        assert_eq!(parse_date("01.03.1998"), day(1998, 3, 1));
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder(""));
        assert!(is_placeholder(" NULL "));
        assert!(is_placeholder("n/a"));
        assert!(!is_placeholder("Kherson"));
    }
}
