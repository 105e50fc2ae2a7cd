//! Rental pricing and date helpers.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::error::{Error, Result};
use crate::money::Money;

/// Display format for dates.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Display format for timestamps.
pub const DATETIME_FORMAT: &str = "%d-%m-%Y %I:%M %p";

/// Number of billable days between two dates, never less than one.
#[must_use]
pub fn calculate_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().max(1)
}

/// Total price for renting at `daily_rate` from `start` to `end`.
///
/// # Errors
///
/// Returns a validation error if the total does not fit in [`Money`].
pub fn calculate_total(daily_rate: Money, start: NaiveDate, end: NaiveDate) -> Result<Money> {
    let days = calculate_days(start, end);
    daily_rate.checked_mul(days).ok_or_else(|| {
        Error::validation(
            "total_amount",
            format!("{days} days at {daily_rate} per day is too large to price"),
        )
    })
}

/// Format an amount as `₹1,234.50`.
#[must_use]
pub fn format_currency(amount: Money) -> String {
    amount.to_string()
}

/// Format a date as `dd-mm-YYYY`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a timestamp as `dd-mm-YYYY hh:mm AM`.
#[must_use]
pub fn format_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(DATETIME_FORMAT).to_string()
}

/// Parse a date given as `YYYY-MM-DD` or `dd-mm-YYYY`.
///
/// # Errors
///
/// Returns a validation error if neither format matches.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, DATE_FORMAT))
        .map_err(|_| {
            Error::validation(
                "date",
                format!("{input:?} is not a date (use YYYY-MM-DD or DD-MM-YYYY)"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calculate_days() {
        assert_eq!(calculate_days(date(2026, 1, 1), date(2026, 1, 4)), 3);
        assert_eq!(calculate_days(date(2026, 1, 31), date(2026, 2, 2)), 2);
    }

    #[test]
    fn test_calculate_days_minimum_one() {
        assert_eq!(calculate_days(date(2026, 1, 1), date(2026, 1, 1)), 1);
        assert_eq!(calculate_days(date(2026, 1, 5), date(2026, 1, 1)), 1);
    }

    #[test]
    fn test_calculate_total() {
        let total =
            calculate_total(Money::from_rupees(3500), date(2026, 3, 1), date(2026, 3, 4)).unwrap();
        assert_eq!(total, Money::from_rupees(10_500));
    }

    #[test]
    fn test_calculate_total_overflow() {
        let rate = Money::from_paise(i64::MAX / 2 + 1);
        let err = calculate_total(rate, date(2026, 3, 1), date(2026, 3, 3)).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation {
                field: "total_amount",
                ..
            }
        ));
        // A single day never overflows.
        assert_eq!(
            calculate_total(rate, date(2026, 3, 1), date(2026, 3, 2)).unwrap(),
            rate
        );
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Money::from_paise(123_450)), "₹1,234.50");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(date(2026, 7, 9)), "09-07-2026");
    }

    #[test]
    fn test_format_datetime() {
        let at = Utc.with_ymd_and_hms(2026, 7, 9, 15, 30, 0).unwrap();
        assert_eq!(format_datetime(&at), "09-07-2026 03:30 PM");
    }

    #[test]
    fn test_parse_date_both_formats() {
        assert_eq!(parse_date("2026-07-09").unwrap(), date(2026, 7, 9));
        assert_eq!(parse_date("09-07-2026").unwrap(), date(2026, 7, 9));
        assert_eq!(parse_date(" 2026-12-31 ").unwrap(), date(2026, 12, 31));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        let err = parse_date("tomorrow").unwrap_err();
        assert!(err.to_string().contains("tomorrow"));
        assert!(parse_date("2026-02-30").is_err());
    }
}
