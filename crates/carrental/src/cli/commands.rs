//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::models::{CarStatus, PaymentMethod};
use crate::money::Money;

fn parse_money(input: &str) -> Result<Money, String> {
    Money::parse(input).map_err(|e| e.to_string())
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    crate::pricing::parse_date(input).map_err(|e| e.to_string())
}

/// Fleet management commands.
#[derive(Debug, Subcommand)]
pub enum CarsCommand {
    /// List cars
    List {
        /// Only cars that can be booked now
        #[arg(short, long)]
        available: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one car
    Show {
        /// Car identifier (CAR_XXXXXXXX)
        car_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Add a car to the fleet (admin)
    Add(AddCarArgs),

    /// Change a car's details (admin)
    Edit(EditCarArgs),

    /// Remove a car from the fleet (admin)
    Delete {
        /// Car identifier
        car_id: String,
    },
}

/// Arguments for `cars add`.
#[derive(Debug, Args)]
pub struct AddCarArgs {
    /// Manufacturer, e.g. "Toyota"
    #[arg(long)]
    pub brand: String,

    /// Model, e.g. "Fortuner"
    #[arg(long)]
    pub model: String,

    /// Model year
    #[arg(long)]
    pub year: i32,

    /// Daily rate in rupees, e.g. 3500 or 2499.50
    #[arg(long, value_parser = parse_money)]
    pub rate: Money,

    /// Paint colour
    #[arg(long)]
    pub color: String,

    /// Fuel type
    #[arg(long, default_value = "Petrol")]
    pub fuel: String,

    /// Seating capacity
    #[arg(long, default_value_t = 5)]
    pub seats: u32,

    /// Picture URL
    #[arg(long, default_value = "")]
    pub image_url: String,
}

/// Arguments for `cars edit`. Only the given fields change.
#[derive(Debug, Args)]
pub struct EditCarArgs {
    /// Car identifier
    pub car_id: String,

    /// Manufacturer
    #[arg(long)]
    pub brand: Option<String>,

    /// Model
    #[arg(long)]
    pub model: Option<String>,

    /// Model year
    #[arg(long)]
    pub year: Option<i32>,

    /// Daily rate in rupees
    #[arg(long, value_parser = parse_money)]
    pub rate: Option<Money>,

    /// Availability
    #[arg(long, value_enum)]
    pub status: Option<CarStatusArg>,

    /// Paint colour
    #[arg(long)]
    pub color: Option<String>,

    /// Fuel type
    #[arg(long)]
    pub fuel: Option<String>,

    /// Seating capacity
    #[arg(long)]
    pub seats: Option<u32>,

    /// Picture URL
    #[arg(long)]
    pub image_url: Option<String>,
}

/// Booking commands.
#[derive(Debug, Subcommand)]
pub enum BookingsCommand {
    /// List bookings (customers see their own)
    List {
        /// Only active bookings
        #[arg(short, long)]
        active: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one booking and its payments
    Show {
        /// Booking identifier (BOOK_XXXXXXXX)
        booking_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Book a car and pay online
    Create {
        /// Car to rent
        car_id: String,

        /// First rental day (YYYY-MM-DD or DD-MM-YYYY)
        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,

        /// Return day (YYYY-MM-DD or DD-MM-YYYY)
        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,

        /// Show the price without booking
        #[arg(long)]
        quote: bool,
    },

    /// Cancel an active booking
    Cancel {
        /// Booking identifier
        booking_id: String,
    },

    /// Mark an active booking as completed (admin)
    Complete {
        /// Booking identifier
        booking_id: String,
    },
}

/// Payment commands.
#[derive(Debug, Subcommand)]
pub enum PaymentsCommand {
    /// List payments (customers see their own)
    List {
        /// Only payments for this booking
        #[arg(short, long)]
        booking: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Record a payment against a booking (admin)
    Record {
        /// Booking identifier
        booking_id: String,

        /// Amount in rupees
        #[arg(long, value_parser = parse_money)]
        amount: Money,

        /// How it was paid
        #[arg(long, value_enum, default_value = "cash")]
        method: PaymentMethodArg,
    },
}

/// Customer commands (admin).
#[derive(Debug, Subcommand)]
pub enum CustomersCommand {
    /// List registered customers
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Registration arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Login email
    #[arg(long)]
    pub email: String,

    /// Full name
    #[arg(long)]
    pub name: String,

    /// 10-digit mobile number
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Postal address
    #[arg(long, default_value = "")]
    pub address: String,

    /// Password (read from stdin when omitted)
    #[arg(long)]
    pub password: Option<String>,
}

/// Live change feed arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Collections to watch (defaults to the configured ones)
    #[arg(long = "collection", value_name = "NAME")]
    pub collections: Vec<String>,

    /// Poll interval in milliseconds
    #[arg(short, long)]
    pub interval_ms: Option<u64>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Car availability argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CarStatusArg {
    /// Free to book
    Available,
    /// Held by a booking
    Booked,
}

impl From<CarStatusArg> for CarStatus {
    fn from(arg: CarStatusArg) -> Self {
        match arg {
            CarStatusArg::Available => Self::Available,
            CarStatusArg::Booked => Self::Booked,
        }
    }
}

/// Payment method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaymentMethodArg {
    /// Paid at the counter
    Cash,
    /// Paid by card
    Card,
    /// Paid online
    Online,
}

impl From<PaymentMethodArg> for PaymentMethod {
    fn from(arg: PaymentMethodArg) -> Self {
        match arg {
            PaymentMethodArg::Cash => Self::Cash,
            PaymentMethodArg::Card => Self::Card,
            PaymentMethodArg::Online => Self::Online,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_status_arg_conversion() {
        assert_eq!(CarStatus::from(CarStatusArg::Available), CarStatus::Available);
        assert_eq!(CarStatus::from(CarStatusArg::Booked), CarStatus::Booked);
    }

    #[test]
    fn test_payment_method_arg_conversion() {
        assert_eq!(PaymentMethod::from(PaymentMethodArg::Cash), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::from(PaymentMethodArg::Card), PaymentMethod::Card);
        assert_eq!(PaymentMethod::from(PaymentMethodArg::Online), PaymentMethod::Online);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_money("2,499.50").unwrap(), Money::from_paise(249_950));
        assert!(parse_money("lots").is_err());
        assert_eq!(
            parse_date("25-12-2026").unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()
        );
        assert!(parse_date("Christmas").unwrap_err().contains("Christmas"));
    }
}
