//! The customer booking flow: validate dates, price the rental, book the
//! car and record the online payment.

use chrono::NaiveDate;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    generate_id, Booking, BookingStatus, Payment, PaymentMethod, User, BOOKING_ID_PREFIX,
};
use crate::pricing;
use crate::repository::Repository;
use crate::validation;

/// A customer's request to rent a car.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    /// Car to rent.
    pub car_id: String,
    /// First rental day.
    pub start_date: NaiveDate,
    /// Return day.
    pub end_date: NaiveDate,
}

/// A confirmed booking and its payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReceipt {
    /// The stored booking.
    pub booking: Booking,
    /// The payment recorded for it.
    pub payment: Payment,
}

/// What a rental would cost, without booking anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Billable days.
    pub days: i64,
    /// Price for the whole rental.
    pub total: crate::money::Money,
}

/// Price a rental of `car_id` over the requested dates.
///
/// # Errors
///
/// Returns a validation error for bad dates or a total too large to price,
/// or `NotFound` for an unknown car.
pub async fn quote(repo: &Repository, request: &BookingRequest, today: NaiveDate) -> Result<Quote> {
    validation::validate_rental_dates(request.start_date, request.end_date, today)?;
    let car = repo.car(&request.car_id).await?;
    Ok(Quote {
        days: pricing::calculate_days(request.start_date, request.end_date),
        total: pricing::calculate_total(car.daily_rate, request.start_date, request.end_date)?,
    })
}

/// Book a car for `customer` and record a completed online payment.
///
/// # Errors
///
/// Returns a validation error for bad dates or an unpriceable total,
/// `NotFound` for an unknown car, or `CarUnavailable` if the car is booked or
/// the dates overlap another active booking.
pub async fn book_car(
    repo: &Repository,
    customer: &User,
    request: &BookingRequest,
    today: NaiveDate,
) -> Result<BookingReceipt> {
    validation::validate_rental_dates(request.start_date, request.end_date, today)?;

    let car = repo.car(&request.car_id).await?;
    if !car.is_available() {
        return Err(Error::CarUnavailable {
            car_id: car.car_id,
        });
    }
    let total_amount =
        pricing::calculate_total(car.daily_rate, request.start_date, request.end_date)?;

    let booking = Booking {
        booking_id: generate_id(BOOKING_ID_PREFIX),
        customer_id: customer.uid.clone(),
        car_id: car.car_id.clone(),
        start_date: request.start_date,
        end_date: request.end_date,
        total_amount,
        status: BookingStatus::Active,
        customer_name: customer.name.clone(),
        car_info: car.display_name(),
        created_at: chrono::Utc::now(),
    };
    repo.create_booking(&booking).await?;

    let payment = Payment::completed(&booking.booking_id, booking.total_amount, PaymentMethod::Online);
    repo.create_payment(&payment).await?;

    info!(
        booking_id = %booking.booking_id,
        total = %booking.total_amount,
        days = booking.days(),
        "Car booked"
    );
    Ok(BookingReceipt { booking, payment })
}
