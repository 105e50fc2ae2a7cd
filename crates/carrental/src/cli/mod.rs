//! Command-line interface for carrental.
//!
//! This module provides the CLI structure for the `carrent` binary. The
//! handlers live in [`crate::app`].

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCarArgs, BookingsCommand, CarStatusArg, CarsCommand, ConfigCommand, CustomersCommand,
    EditCarArgs, OutputFormat, PaymentMethodArg, PaymentsCommand, RegisterCommand, StatusCommand,
    WatchCommand,
};

use crate::logging::Verbosity;

/// carrent - Run a car rental business from the terminal
///
/// Manage the fleet, take bookings and record payments against a local
/// SQLite database or a Firestore project.
#[derive(Debug, Parser)]
#[command(name = "carrent")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the default admin and the sample fleet
    Init {
        /// Skip the sample cars
        #[arg(long)]
        no_sample_cars: bool,
    },

    /// Log in and remember the session
    Login {
        /// Account email
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the saved session
    Logout,

    /// Create a customer account
    Register(RegisterCommand),

    /// Show the logged-in account
    Whoami,

    /// Browse and manage the fleet
    #[command(subcommand)]
    Cars(CarsCommand),

    /// Book, cancel and complete rentals
    #[command(subcommand)]
    Bookings(BookingsCommand),

    /// Payment history
    #[command(subcommand)]
    Payments(PaymentsCommand),

    /// Registered customers (admin)
    #[command(subcommand)]
    Customers(CustomersCommand),

    /// Dashboard totals (admin)
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show backend and document counts
    Status(StatusCommand),

    /// Print changes to cars and bookings as they happen
    Watch(WatchCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
