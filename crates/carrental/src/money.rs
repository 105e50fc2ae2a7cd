//! Monetary amounts in integer minor units.
//!
//! Rates, booking totals and payments are all carried as whole paise so that
//! multiplying a daily rate by a day count never loses precision.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Currency symbol used for display.
pub const CURRENCY_SYMBOL: &str = "₹";

/// A monetary value in paise (1/100 of a rupee).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a value from paise.
    #[must_use]
    pub const fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    /// Create a value from whole rupees.
    #[must_use]
    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// The value in paise.
    #[must_use]
    pub const fn paise(self) -> i64 {
        self.0
    }

    /// `self * factor`, or `None` on overflow.
    #[must_use]
    pub const fn checked_mul(self, factor: i64) -> Option<Self> {
        match self.0.checked_mul(factor) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// `self + rhs`, or `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// Whether the value is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal amount such as `3500`, `2,499.5` or `₹1,200.00`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for anything that is not a plain decimal
    /// number with at most two fractional digits.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::validation("amount", format!("not a valid amount: {input:?}"));

        let cleaned: String = input
            .trim()
            .trim_start_matches(CURRENCY_SYMBOL)
            .chars()
            .filter(|c| *c != ',')
            .collect();
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let (major, minor) = digits.split_once('.').unwrap_or((digits, ""));
        if major.is_empty() && minor.is_empty() {
            return Err(invalid());
        }
        if !major.chars().all(|c| c.is_ascii_digit())
            || !minor.chars().all(|c| c.is_ascii_digit())
            || minor.len() > 2
        {
            return Err(invalid());
        }

        let major: i64 = if major.is_empty() {
            0
        } else {
            major.parse().map_err(|_| invalid())?
        };
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => minor.parse().map_err(|_| invalid())?,
        };

        let paise = major
            .checked_mul(100)
            .and_then(|p| p.checked_add(minor))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -paise } else { paise }))
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// Sums saturate at the i64 bounds; use `checked_add` where overflow must be reported.
impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let rupees = (abs / 100).to_string();
        let paise = abs % 100;

        let mut grouped = String::with_capacity(rupees.len() + rupees.len() / 3);
        for (i, ch) in rupees.chars().enumerate() {
            if i > 0 && (rupees.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{sign}{CURRENCY_SYMBOL}{grouped}.{paise:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_rupees(3500).to_string(), "₹3,500.00");
        assert_eq!(Money::from_paise(123_456_789).to_string(), "₹1,234,567.89");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(Money::from_paise(-150_050).to_string(), "-₹1,500.50");
    }

    #[test]
    fn test_parse_plain_and_decimal() {
        assert_eq!(Money::parse("3500").unwrap(), Money::from_rupees(3500));
        assert_eq!(Money::parse("2499.5").unwrap(), Money::from_paise(249_950));
        assert_eq!(Money::parse("0.99").unwrap(), Money::from_paise(99));
        assert_eq!(Money::parse(".5").unwrap(), Money::from_paise(50));
    }

    #[test]
    fn test_parse_with_symbol_and_commas() {
        assert_eq!(Money::parse("₹1,200.00").unwrap(), Money::from_rupees(1200));
        assert_eq!(Money::parse("  2,000 ").unwrap(), Money::from_rupees(2000));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Money::parse("").is_err());
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("12.345").is_err());
        assert!(Money::parse("1.2.3").is_err());
        assert!(Money::parse(".").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let rate = Money::from_rupees(2000);
        assert_eq!(rate.checked_mul(3), Some(Money::from_rupees(6000)));
        assert_eq!(rate.checked_add(rate), Some(Money::from_rupees(4000)));

        let mut total = Money::zero();
        total += rate;
        assert_eq!(total + rate, Money::from_rupees(4000));

        let sum: Money = vec![rate, rate, Money::from_paise(50)].into_iter().sum();
        assert_eq!(sum.paise(), 400_050);
    }

    #[test]
    fn test_arithmetic_overflow() {
        let huge = Money::parse("92233720368547758.07").unwrap();
        assert_eq!(huge.paise(), i64::MAX);
        assert_eq!(huge.checked_mul(2), None);
        assert_eq!(huge.checked_add(Money::from_paise(1)), None);

        assert_eq!(huge + Money::from_paise(1), huge);
        let sum: Money = vec![huge, huge].into_iter().sum();
        assert_eq!(sum, huge);
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&Money::from_paise(350_000)).unwrap();
        assert_eq!(json, "350000");
        let back: Money = serde_json::from_str("350000").unwrap();
        assert_eq!(back, Money::from_rupees(3500));
    }
}
