//! `carrental` - Car rental management over a document store
//!
//! This library provides the fleet, booking and payment logic behind the
//! `carrent` CLI. Records live in a [`storage::DocumentStore`], either a
//! local `SQLite` file or a Firestore project reached over REST.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod money;
pub mod pricing;
pub mod rental;
pub mod repository;
pub mod seed;
pub mod session;
pub mod storage;
pub mod sync;
pub mod validation;

pub use app::App;
pub use auth::{AuthManager, NewUser};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use models::{Booking, BookingStatus, Car, CarStatus, Payment, PaymentMethod, Role, User};
pub use money::Money;
pub use repository::{DashboardStats, Repository};
pub use storage::{DocumentStore, FirestoreStore, SqliteStore, StorageStats};
