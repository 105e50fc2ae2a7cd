//! Rendering of records for the terminal.
//!
//! Every renderer returns a `String` so handlers can be tested without
//! capturing stdout.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::models::{Booking, Car, Payment, User};
use crate::pricing::{format_date, format_datetime};
use crate::repository::DashboardStats;
use crate::sync::{ChangeEvent, ChangeKind};

/// Placeholder shown instead of secrets.
pub const REDACTED: &str = "********";

/// A left-aligned text table.
#[derive(Debug, Default)]
struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let header: Vec<String> = self.headers.iter().map(ToString::to_string).collect();
        push_line(&mut out, &header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths);
        for row in &self.rows {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let pad = width.saturating_sub(cell.chars().count());
        line.push_str(cell);
        line.extend(std::iter::repeat(' ').take(pad));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn empty(what: &str) -> String {
    format!("No {what} found.")
}

/// Render a list of cars.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_cars(cars: &[Car], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(cars);
    }
    if cars.is_empty() {
        return Ok(empty("cars"));
    }

    Ok(match format {
        OutputFormat::Table => {
            let mut table = Table::new(&["ID", "CAR", "YEAR", "RATE/DAY", "FUEL", "SEATS", "STATUS"]);
            for car in cars {
                table.row(vec![
                    car.car_id.clone(),
                    car.display_name(),
                    car.year.to_string(),
                    car.daily_rate.to_string(),
                    car.fuel_type.clone(),
                    car.seats.to_string(),
                    car.status.to_string(),
                ]);
            }
            table.render()
        }
        _ => cars
            .iter()
            .map(|car| {
                format!(
                    "{}  {} ({})  {}/day  {}\n",
                    car.car_id,
                    car.display_name(),
                    car.year,
                    car.daily_rate,
                    car.status
                )
            })
            .collect(),
    })
}

/// Render one car in full.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_car(car: &Car, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(car);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", car.display_name(), car.car_id);
    let _ = writeln!(out, "  Year:       {}", car.year);
    let _ = writeln!(out, "  Daily rate: {}", car.daily_rate);
    let _ = writeln!(out, "  Status:     {}", car.status);
    let _ = writeln!(out, "  Colour:     {}", car.color);
    let _ = writeln!(out, "  Fuel:       {}", car.fuel_type);
    let _ = writeln!(out, "  Seats:      {}", car.seats);
    if !car.image_url.is_empty() {
        let _ = writeln!(out, "  Image:      {}", car.image_url);
    }
    Ok(out)
}

/// Render a list of bookings.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_bookings(bookings: &[Booking], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(bookings);
    }
    if bookings.is_empty() {
        return Ok(empty("bookings"));
    }

    Ok(match format {
        OutputFormat::Table => {
            let mut table = Table::new(&["ID", "CUSTOMER", "CAR", "FROM", "TO", "TOTAL", "STATUS"]);
            for b in bookings {
                table.row(vec![
                    b.booking_id.clone(),
                    b.customer_name.clone(),
                    b.car_info.clone(),
                    format_date(b.start_date),
                    format_date(b.end_date),
                    b.total_amount.to_string(),
                    b.status.to_string(),
                ]);
            }
            table.render()
        }
        _ => bookings
            .iter()
            .map(|b| {
                format!(
                    "{}  {}  {} to {}  {}  {}\n",
                    b.booking_id,
                    b.car_info,
                    format_date(b.start_date),
                    format_date(b.end_date),
                    b.total_amount,
                    b.status
                )
            })
            .collect(),
    })
}

/// Render one booking with its payments.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_booking(booking: &Booking, payments: &[Payment], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(&serde_json::json!({
            "booking": booking,
            "payments": payments,
        }));
    }

    let mut out = String::new();
    let _ = writeln!(out, "Booking {}", booking.booking_id);
    let _ = writeln!(out, "  Customer: {} ({})", booking.customer_name, booking.customer_id);
    let _ = writeln!(out, "  Car:      {} ({})", booking.car_info, booking.car_id);
    let _ = writeln!(
        out,
        "  Dates:    {} to {} ({} day(s))",
        format_date(booking.start_date),
        format_date(booking.end_date),
        booking.days()
    );
    let _ = writeln!(out, "  Total:    {}", booking.total_amount);
    let _ = writeln!(out, "  Status:   {}", booking.status);
    let _ = writeln!(out, "  Booked:   {}", format_datetime(&booking.created_at));
    if payments.is_empty() {
        let _ = writeln!(out, "  Payments: none");
    } else {
        let _ = writeln!(out, "  Payments:");
        for p in payments {
            let _ = writeln!(
                out,
                "    {}  {}  {}  {}",
                p.payment_id, p.amount, p.payment_method, p.status
            );
        }
    }
    Ok(out)
}

/// Render a list of payments.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_payments(payments: &[Payment], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(payments);
    }
    if payments.is_empty() {
        return Ok(empty("payments"));
    }

    Ok(match format {
        OutputFormat::Table => {
            let mut table = Table::new(&["ID", "BOOKING", "AMOUNT", "METHOD", "STATUS", "DATE"]);
            for p in payments {
                table.row(vec![
                    p.payment_id.clone(),
                    p.booking_id.clone(),
                    p.amount.to_string(),
                    p.payment_method.to_string(),
                    p.status.to_string(),
                    format_datetime(&p.payment_date),
                ]);
            }
            table.render()
        }
        _ => payments
            .iter()
            .map(|p| {
                format!(
                    "{}  {}  {}  {}\n",
                    p.payment_id, p.booking_id, p.amount, p.status
                )
            })
            .collect(),
    })
}

/// Render a list of customers.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_customers(users: &[User], format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(users);
    }
    if users.is_empty() {
        return Ok(empty("customers"));
    }

    Ok(match format {
        OutputFormat::Table => {
            let mut table = Table::new(&["ID", "NAME", "EMAIL", "PHONE", "JOINED"]);
            for u in users {
                table.row(vec![
                    u.uid.clone(),
                    u.name.clone(),
                    u.email.clone(),
                    u.phone.clone(),
                    format_date(u.created_at.date_naive()),
                ]);
            }
            table.render()
        }
        _ => users
            .iter()
            .map(|u| format!("{}  {} <{}>\n", u.uid, u.name, u.email))
            .collect(),
    })
}

/// Describe the logged-in account.
#[must_use]
pub fn render_user(user: &User) -> String {
    let mut out = format!("{} <{}>\n", user.name, user.email);
    let _ = writeln!(out, "  ID:    {}", user.uid);
    let _ = writeln!(out, "  Role:  {}", user.role);
    if !user.phone.is_empty() {
        let _ = writeln!(out, "  Phone: {}", user.phone);
    }
    if !user.address.is_empty() {
        let _ = writeln!(out, "  Address: {}", user.address);
    }
    out
}

/// Render the dashboard totals.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_stats(stats: &DashboardStats, as_json: bool) -> Result<String> {
    if as_json {
        return json(stats);
    }

    let mut out = String::from("Dashboard\n---------\n");
    let _ = writeln!(out, "Cars:            {}", stats.total_cars);
    let _ = writeln!(out, "  Available:     {}", stats.available_cars);
    let _ = writeln!(out, "  Booked:        {}", stats.booked_cars);
    let _ = writeln!(out, "Bookings:        {}", stats.total_bookings);
    let _ = writeln!(out, "  Active:        {}", stats.active_bookings);
    let _ = writeln!(out, "Customers:       {}", stats.total_customers);
    let _ = writeln!(out, "Revenue:         {}", stats.total_revenue);
    Ok(out)
}

/// One line describing a change from the live feed.
#[must_use]
pub fn render_event(event: &ChangeEvent) -> String {
    let mut line = format!(
        "{:<8} {}/{}",
        event.kind.to_string(),
        event.collection,
        event.id
    );
    if event.kind != ChangeKind::Removed {
        if let Some(Value::String(status)) = event.fields.as_ref().and_then(|f| f.get("status")) {
            let _ = write!(line, " [{status}]");
        }
    }
    line
}

/// A copy of the configuration with secrets replaced.
#[must_use]
pub fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.cloud.api_key.is_some() {
        config.cloud.api_key = Some(REDACTED.to_string());
    }
    config
}

fn show(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

/// Render the effective configuration. The API key is never shown.
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub fn render_config(config: &Config, as_json: bool) -> Result<String> {
    let config = redacted(config);
    if as_json {
        return json(&config);
    }

    let mut out = String::from("Current Configuration\n=====================\n\n");
    let _ = writeln!(out, "[Storage]");
    let _ = writeln!(out, "  Backend:          {}", config.storage.backend);
    let _ = writeln!(out, "  Database path:    {}", config.database_path().display());
    let _ = writeln!(out);
    let _ = writeln!(out, "[Cloud]");
    let _ = writeln!(out, "  Project id:       {}", show(config.cloud.project_id.as_deref()));
    let _ = writeln!(out, "  API key:          {}", show(config.cloud.api_key.as_deref()));
    let _ = writeln!(out, "  Auth domain:      {}", show(config.cloud.auth_domain.as_deref()));
    let _ = writeln!(
        out,
        "  Credentials:      {}",
        config
            .cloud
            .credentials_path
            .as_ref()
            .map_or_else(|| "(not set)".to_string(), |p| p.display().to_string())
    );
    let _ = writeln!(out, "  Emulator:         {}", show(config.cloud.emulator_host.as_deref()));
    let _ = writeln!(out, "  Timeout (secs):   {}", config.cloud.request_timeout_secs);
    let _ = writeln!(out);
    let _ = writeln!(out, "[Session]");
    let _ = writeln!(out, "  Session file:     {}", config.session_path().display());
    let _ = writeln!(out, "  TTL (hours):      {}", config.session.ttl_hours);
    let _ = writeln!(out);
    let _ = writeln!(out, "[Sync]");
    let _ = writeln!(out, "  Poll interval ms: {}", config.sync.poll_interval_ms);
    let _ = writeln!(out, "  Collections:      {}", config.sync.collections.join(", "));
    let _ = writeln!(out);
    let _ = writeln!(out, "[Seed]");
    let _ = writeln!(out, "  Enabled:          {}", config.seed.enabled);
    let _ = writeln!(out, "  Admin email:      {}", config.seed.admin_email);
    let _ = writeln!(out, "  Sample cars:      {}", config.seed.sample_cars);
    Ok(out)
}
