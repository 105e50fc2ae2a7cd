//! Core record types for carrental.
//!
//! This module defines the users, cars, bookings and payments stored in the
//! document store, along with their status enums.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::money::Money;

/// Prefix for user identifiers.
pub const USER_ID_PREFIX: &str = "USER_";
/// Prefix for car identifiers.
pub const CAR_ID_PREFIX: &str = "CAR_";
/// Prefix for booking identifiers.
pub const BOOKING_ID_PREFIX: &str = "BOOK_";
/// Prefix for payment identifiers.
pub const PAYMENT_ID_PREFIX: &str = "PAY_";

/// Generate a short record identifier: the prefix followed by eight
/// upper-case hex digits of a random UUID.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", hex[..8].to_uppercase())
}

macro_rules! string_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($text) {
                    return Ok(Self::$variant);
                })+
                Err(Error::validation($what, format!("unknown value {s:?}")))
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages the fleet, bookings and customers.
    Admin,
    /// Browses cars and books rentals.
    #[default]
    Customer,
}

string_enum!(Role, "role", { Admin => "admin", Customer => "customer" });

/// Whether a car can currently be booked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarStatus {
    /// Free to book.
    #[default]
    Available,
    /// Held by an active booking.
    Booked,
}

string_enum!(CarStatus, "status", { Available => "Available", Booked => "Booked" });

/// Lifecycle of a booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Confirmed and holding the car.
    #[default]
    Active,
    /// The car was returned.
    Completed,
    /// Cancelled before completion.
    Cancelled,
}

string_enum!(BookingStatus, "booking status", {
    Active => "Active",
    Completed => "Completed",
    Cancelled => "Cancelled",
});

/// How a payment was made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Paid at the counter.
    #[default]
    Cash,
    /// Paid by card.
    Card,
    /// Paid online while booking.
    Online,
}

string_enum!(PaymentMethod, "payment method", {
    Cash => "Cash",
    Card => "Card",
    Online => "Online",
});

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Funds received.
    #[default]
    Completed,
    /// Awaiting settlement.
    Pending,
    /// Returned to the customer.
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Completed => "Completed",
    Pending => "Pending",
    Refunded => "Refunded",
});

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (`USER_XXXXXXXX`).
    pub uid: String,
    /// Login email, unique across users.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Account role.
    #[serde(default)]
    pub role: Role,
    /// Contact phone number.
    #[serde(default)]
    pub phone: String,
    /// Postal address.
    #[serde(default)]
    pub address: String,
    /// When the account was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// New address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A car in the rental fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Unique identifier (`CAR_XXXXXXXX`).
    pub car_id: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: i32,
    /// Price per rental day.
    pub daily_rate: Money,
    /// Availability.
    #[serde(default)]
    pub status: CarStatus,
    /// Paint colour.
    #[serde(default)]
    pub color: String,
    /// Fuel type ("Petrol", "Diesel", ...).
    #[serde(default)]
    pub fuel_type: String,
    /// Seating capacity.
    #[serde(default = "default_seats")]
    pub seats: u32,
    /// Optional picture.
    #[serde(default)]
    pub image_url: String,
}

fn default_seats() -> u32 {
    5
}

impl Car {
    /// `"<brand> <model>"`, as shown on bookings.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    /// Whether the car is marked available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == CarStatus::Available
    }
}

/// Fields for a new car. The identifier and status are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: i32,
    /// Price per rental day.
    pub daily_rate: Money,
    /// Paint colour.
    pub color: String,
    /// Fuel type.
    pub fuel_type: String,
    /// Seating capacity.
    pub seats: u32,
    /// Optional picture.
    pub image_url: String,
}

impl NewCar {
    /// Build the stored record with a fresh identifier.
    #[must_use]
    pub fn into_car(self) -> Car {
        Car {
            car_id: generate_id(CAR_ID_PREFIX),
            brand: self.brand,
            model: self.model,
            year: self.year,
            daily_rate: self.daily_rate,
            status: CarStatus::Available,
            color: self.color,
            fuel_type: self.fuel_type,
            seats: self.seats,
            image_url: self.image_url,
        }
    }
}

/// A partial car edit. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CarUpdate {
    /// Manufacturer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Model year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Price per rental day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_rate: Option<Money>,
    /// Availability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,
    /// Paint colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Fuel type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    /// Seating capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats: Option<u32>,
    /// Picture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CarUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the set fields to a car.
    pub fn apply(&self, car: &mut Car) {
        if let Some(brand) = &self.brand {
            car.brand.clone_from(brand);
        }
        if let Some(model) = &self.model {
            car.model.clone_from(model);
        }
        if let Some(year) = self.year {
            car.year = year;
        }
        if let Some(rate) = self.daily_rate {
            car.daily_rate = rate;
        }
        if let Some(status) = self.status {
            car.status = status;
        }
        if let Some(color) = &self.color {
            car.color.clone_from(color);
        }
        if let Some(fuel_type) = &self.fuel_type {
            car.fuel_type.clone_from(fuel_type);
        }
        if let Some(seats) = self.seats {
            car.seats = seats;
        }
        if let Some(image_url) = &self.image_url {
            car.image_url.clone_from(image_url);
        }
    }
}

/// A rental of one car by one customer over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier (`BOOK_XXXXXXXX`).
    pub booking_id: String,
    /// The renting user.
    pub customer_id: String,
    /// The rented car.
    pub car_id: String,
    /// First rental day.
    pub start_date: NaiveDate,
    /// Return day (exclusive).
    pub end_date: NaiveDate,
    /// Price for the whole rental.
    pub total_amount: Money,
    /// Lifecycle state.
    #[serde(default)]
    pub status: BookingStatus,
    /// Customer name at booking time.
    #[serde(default)]
    pub customer_name: String,
    /// `"<brand> <model>"` at booking time.
    #[serde(default)]
    pub car_info: String,
    /// When the booking was made.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Whether the booking still holds its car.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// Billable days, at least one.
    #[must_use]
    pub fn days(&self) -> i64 {
        crate::pricing::calculate_days(self.start_date, self.end_date)
    }

    /// Whether `[start, end)` intersects this booking's `[start_date, end_date)`.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        !(end <= self.start_date || start >= self.end_date)
    }
}

/// A payment against a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier (`PAY_XXXXXXXX`).
    pub payment_id: String,
    /// The booking paid for.
    pub booking_id: String,
    /// Amount paid.
    pub amount: Money,
    /// When it was paid.
    #[serde(default = "Utc::now")]
    pub payment_date: DateTime<Utc>,
    /// How it was paid.
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Settlement state.
    #[serde(default)]
    pub status: PaymentStatus,
}

impl Payment {
    /// A completed payment made now.
    #[must_use]
    pub fn completed(booking_id: &str, amount: Money, method: PaymentMethod) -> Self {
        Self {
            payment_id: generate_id(PAYMENT_ID_PREFIX),
            booking_id: booking_id.to_string(),
            amount,
            payment_date: Utc::now(),
            payment_method: method,
            status: PaymentStatus::Completed,
        }
    }
}
