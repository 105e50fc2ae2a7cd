//! Input validation for registrations, cars and bookings.
//!
//! Every check returns `Error::Validation` naming the offending field, so the
//! CLI can report exactly what to fix.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{CarUpdate, NewCar};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Earliest accepted model year.
pub const MIN_CAR_YEAR: i32 = 1900;

/// Largest accepted seating capacity.
pub const MAX_SEATS: u32 = 50;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^[6-9]\d{9}$").expect("phone pattern is valid"))
}

/// Validate an email address.
///
/// # Errors
///
/// Returns a validation error if the address is malformed.
pub fn validate_email(email: &str) -> Result<()> {
    if email_regex().is_match(email.trim()) {
        Ok(())
    } else {
        Err(Error::validation("email", "please enter a valid email address"))
    }
}

/// Validate a 10-digit Indian mobile number starting with 6-9.
///
/// # Errors
///
/// Returns a validation error if the number does not match.
pub fn validate_phone(phone: &str) -> Result<()> {
    if phone_regex().is_match(phone.trim()) {
        Ok(())
    } else {
        Err(Error::validation(
            "phone",
            "enter a valid 10-digit number starting with 6-9",
        ))
    }
}

/// Validate a new password.
///
/// # Errors
///
/// Returns a validation error if the password is too short.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters long"),
        ));
    }
    Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    Ok(())
}

fn validate_year(year: i32, today: NaiveDate) -> Result<()> {
    let max = today.year() + 1;
    if !(MIN_CAR_YEAR..=max).contains(&year) {
        return Err(Error::validation(
            "year",
            format!("must be between {MIN_CAR_YEAR} and {max}"),
        ));
    }
    Ok(())
}

fn validate_seats(seats: u32) -> Result<()> {
    if !(1..=MAX_SEATS).contains(&seats) {
        return Err(Error::validation(
            "seats",
            format!("must be between 1 and {MAX_SEATS}"),
        ));
    }
    Ok(())
}

/// Validate a new car.
///
/// # Errors
///
/// Returns a validation error for the first rule the car breaks.
pub fn validate_new_car(car: &NewCar, today: NaiveDate) -> Result<()> {
    require_text("brand", &car.brand)?;
    require_text("model", &car.model)?;
    require_text("color", &car.color)?;
    require_text("fuel_type", &car.fuel_type)?;
    validate_year(car.year, today)?;
    if !car.daily_rate.is_positive() {
        return Err(Error::validation("daily_rate", "must be greater than 0"));
    }
    validate_seats(car.seats)
}

/// Validate the fields set on a car update.
///
/// # Errors
///
/// Returns a validation error for the first set field that breaks a rule.
pub fn validate_car_update(update: &CarUpdate, today: NaiveDate) -> Result<()> {
    if update.is_empty() {
        return Err(Error::validation("update", "nothing to change"));
    }
    if let Some(brand) = &update.brand {
        require_text("brand", brand)?;
    }
    if let Some(model) = &update.model {
        require_text("model", model)?;
    }
    if let Some(color) = &update.color {
        require_text("color", color)?;
    }
    if let Some(fuel_type) = &update.fuel_type {
        require_text("fuel_type", fuel_type)?;
    }
    if let Some(year) = update.year {
        validate_year(year, today)?;
    }
    if let Some(rate) = update.daily_rate {
        if !rate.is_positive() {
            return Err(Error::validation("daily_rate", "must be greater than 0"));
        }
    }
    if let Some(seats) = update.seats {
        validate_seats(seats)?;
    }
    Ok(())
}

/// Validate a requested rental period.
///
/// # Errors
///
/// Returns a validation error if the end is not after the start or the
/// start lies before `today`.
pub fn validate_rental_dates(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<()> {
    if end <= start {
        return Err(Error::validation("end_date", "must be after the start date"));
    }
    if start < today {
        return Err(Error::validation("start_date", "cannot be in the past"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn new_car() -> NewCar {
        NewCar {
            brand: "Toyota".to_string(),
            model: "Fortuner".to_string(),
            year: 2023,
            daily_rate: Money::from_rupees(3500),
            color: "Pearl White".to_string(),
            fuel_type: "Diesel".to_string(),
            seats: 7,
            image_url: String::new(),
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("admin@carrental.com").is_ok());
        assert!(validate_email("first.last+tag@mail.co.in").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("6000000000").is_ok());
        assert!(validate_phone("5876543210").is_err());
        assert!(validate_phone("987654321").is_err());
        assert!(validate_phone("98765432100").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("admin123").is_ok());
        assert!(validate_password("12345").is_err());
    }

    #[test]
    fn test_validate_new_car_ok() {
        assert!(validate_new_car(&new_car(), today()).is_ok());
    }

    #[test]
    fn test_validate_new_car_rules() {
        let mut car = new_car();
        car.brand = "  ".to_string();
        assert!(validate_new_car(&car, today())
            .unwrap_err()
            .to_string()
            .contains("brand"));

        let mut car = new_car();
        car.year = 2028;
        assert!(validate_new_car(&car, today()).is_err());
        car.year = 2027;
        assert!(validate_new_car(&car, today()).is_ok());
        car.year = 1899;
        assert!(validate_new_car(&car, today()).is_err());

        let mut car = new_car();
        car.daily_rate = Money::zero();
        assert!(validate_new_car(&car, today()).is_err());

        let mut car = new_car();
        car.seats = 0;
        assert!(validate_new_car(&car, today()).is_err());
        car.seats = 51;
        assert!(validate_new_car(&car, today()).is_err());
    }

    #[test]
    fn test_validate_car_update() {
        assert!(validate_car_update(&CarUpdate::default(), today()).is_err());

        let ok = CarUpdate {
            seats: Some(4),
            ..CarUpdate::default()
        };
        assert!(validate_car_update(&ok, today()).is_ok());

        let bad = CarUpdate {
            daily_rate: Some(Money::from_paise(-1)),
            ..CarUpdate::default()
        };
        assert!(validate_car_update(&bad, today()).is_err());
    }

    #[test]
    fn test_validate_rental_dates() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        assert!(validate_rental_dates(d(18), d(20), today()).is_ok());
        assert!(validate_rental_dates(d(20), d(20), today()).is_err());
        assert!(validate_rental_dates(d(21), d(20), today()).is_err());
        let err = validate_rental_dates(d(17), d(20), today()).unwrap_err();
        assert!(err.to_string().contains("past"));
    }
}
