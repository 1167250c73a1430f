use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};

/// Widen a single-day range by one day on each side.
///
/// The archive treats range bounds as exclusive, so an exact one-day span
/// returns nothing. Any other range is passed through unchanged.
/// `NaiveDate` carries no zone, so the arithmetic is plain calendar days.
pub fn normalize(start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    if start == end {
        (start - Duration::days(1), end + Duration::days(1))
    } else {
        (start, end)
    }
}

/// Parse a user-entered `YYYY-MM-DD` date
pub fn parse_user_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date '{}' (expected YYYY-MM-DD): {}", value.trim(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> NaiveDate {
        parse_user_date(value).unwrap()
    }

    #[test]
    fn test_single_day_is_widened() {
        assert_eq!(normalize(d("2023-01-05"), d("2023-01-05")), (d("2023-01-04"), d("2023-01-06")));
    }

    #[test]
    fn test_range_is_unchanged() {
        assert_eq!(normalize(d("2023-01-01"), d("2023-01-10")), (d("2023-01-01"), d("2023-01-10")));
    }

    #[test]
    fn test_widening_crosses_boundaries() {
        assert_eq!(normalize(d("2023-01-01"), d("2023-01-01")), (d("2022-12-31"), d("2023-01-02")));
        assert_eq!(normalize(d("2024-02-29"), d("2024-02-29")), (d("2024-02-28"), d("2024-03-01")));
        assert_eq!(normalize(d("2023-03-01"), d("2023-03-01")), (d("2023-02-28"), d("2023-03-02")));
    }

    #[test]
    fn test_parse_user_date() {
        assert_eq!(d(" 2023-12-05 "), NaiveDate::from_ymd_opt(2023, 12, 5).unwrap());
        assert!(parse_user_date("05.12.2023").is_err());
        assert!(parse_user_date("2023-13-01").is_err());
    }
}
