//! Typed access to users, cars, bookings and payments.
//!
//! [`Repository`] wraps a [`DocumentStore`] and owns the rules that span
//! more than one document: a car is marked `Booked` when a booking is made
//! and `Available` again when it ends, overlapping active bookings are
//! refused, and a car with an active booking cannot be deleted.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{
    Booking, BookingStatus, Car, CarStatus, CarUpdate, NewCar, Payment, PaymentStatus, Role, User,
    UserUpdate,
};
use crate::money::Money;
use crate::storage::{
    collections, from_document, to_document, Document, DocumentStore, FieldFilter,
};
use crate::validation;

/// Headline figures for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Cars in the fleet.
    pub total_cars: usize,
    /// Cars marked available.
    pub available_cars: usize,
    /// Cars marked booked.
    pub booked_cars: usize,
    /// All bookings ever made.
    pub total_bookings: usize,
    /// Bookings currently holding a car.
    pub active_bookings: usize,
    /// Registered customers.
    pub total_customers: usize,
    /// Sum of completed payments.
    pub total_revenue: Money,
}

/// Typed CRUD over the document store.
#[derive(Debug, Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    /// Held across the availability check and insert of a booking.
    booking_lock: Arc<Mutex<()>>,
    /// Held across the email check and insert of a new account.
    user_lock: Arc<Mutex<()>>,
}

impl Repository {
    /// Create a repository over a store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            booking_lock: Arc::new(Mutex::new(())),
            user_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    async fn load<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>> {
        match self.store.get(collection, id).await? {
            Some(fields) => from_document(collection, id, fields).map(Some),
            None => Ok(None),
        }
    }

    async fn load_all<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<T>> {
        let documents = if filters.is_empty() {
            self.store.list(collection).await?
        } else {
            self.store.query(collection, filters).await?
        };
        documents
            .into_iter()
            .map(|doc| from_document(collection, &doc.id, doc.fields))
            .collect()
    }

    // === Users ===

    /// Store a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn create_user(&self, user: &User) -> Result<()> {
        self.store
            .set(collections::USERS, &user.uid, to_document(user)?)
            .await?;
        info!(uid = %user.uid, role = %user.role, "Created user");
        Ok(())
    }

    /// Store a new user and their credential document, refusing an email
    /// that is already registered.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if another user has the same email, or an error
    /// if a store operation fails.
    pub async fn create_account(&self, user: &User, credential: Document) -> Result<()> {
        let _guard = self.user_lock.lock().await;

        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(Error::EmailTaken {
                email: user.email.clone(),
            });
        }
        self.create_user(user).await?;
        self.store.set(collections::AUTH, &user.uid, credential).await
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>> {
        self.load(collections::USERS, uid).await
    }

    /// Look up a user by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let users: Vec<User> = self
            .load_all(collections::USERS, &[FieldFilter::eq("email", email.as_str())])
            .await?;
        Ok(users.into_iter().next())
    }

    /// Change a user's profile fields.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist, or a validation error
    /// for a malformed phone number.
    pub async fn update_user(&self, uid: &str, update: &UserUpdate) -> Result<User> {
        if let Some(phone) = update.phone.as_deref().filter(|p| !p.is_empty()) {
            validation::validate_phone(phone)?;
        }
        if !self
            .store
            .update(collections::USERS, uid, to_document(update)?)
            .await?
        {
            return Err(Error::not_found("user", uid));
        }
        self.get_user(uid)
            .await?
            .ok_or_else(|| Error::not_found("user", uid))
    }

    /// Every customer account, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_customers(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .load_all(
                collections::USERS,
                &[FieldFilter::eq("role", Role::Customer.to_string())],
            )
            .await?;
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    /// Delete a user and their stored credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn delete_user(&self, uid: &str) -> Result<bool> {
        let deleted = self.store.delete(collections::USERS, uid).await?;
        self.store.delete(collections::AUTH, uid).await?;
        if deleted {
            info!(uid, "Deleted user");
        }
        Ok(deleted)
    }

    // === Cars ===

    /// Validate and add a car to the fleet.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the car breaks a rule, or an error if
    /// the store write fails.
    pub async fn add_car(&self, car: NewCar, today: NaiveDate) -> Result<Car> {
        validation::validate_new_car(&car, today)?;
        let car = car.into_car();
        self.store
            .set(collections::CARS, &car.car_id, to_document(&car)?)
            .await?;
        info!(car_id = %car.car_id, car = %car.display_name(), "Added car");
        Ok(car)
    }

    /// Look up a car.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_car(&self, car_id: &str) -> Result<Option<Car>> {
        self.load(collections::CARS, car_id).await
    }

    /// Look up a car that must exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such car.
    pub async fn car(&self, car_id: &str) -> Result<Car> {
        self.get_car(car_id)
            .await?
            .ok_or_else(|| Error::not_found("car", car_id))
    }

    /// The whole fleet, ordered by brand and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_cars(&self) -> Result<Vec<Car>> {
        let mut cars: Vec<Car> = self.load_all(collections::CARS, &[]).await?;
        sort_cars(&mut cars);
        Ok(cars)
    }

    /// Cars marked available.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_available_cars(&self) -> Result<Vec<Car>> {
        let mut cars: Vec<Car> = self
            .load_all(
                collections::CARS,
                &[FieldFilter::eq("status", CarStatus::Available.to_string())],
            )
            .await?;
        sort_cars(&mut cars);
        Ok(cars)
    }

    /// Apply a partial edit to a car.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields, or `NotFound` if the car
    /// does not exist.
    pub async fn update_car(&self, car_id: &str, update: &CarUpdate, today: NaiveDate) -> Result<Car> {
        validation::validate_car_update(update, today)?;
        let mut car = self.car(car_id).await?;

        if !self
            .store
            .update(collections::CARS, car_id, to_document(update)?)
            .await?
        {
            return Err(Error::not_found("car", car_id));
        }
        update.apply(&mut car);
        info!(car_id, "Updated car");
        Ok(car)
    }

    /// Mark a car available or booked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the car does not exist.
    pub async fn set_car_status(&self, car_id: &str, status: CarStatus) -> Result<()> {
        let fields = status_document(status.to_string());
        if !self.store.update(collections::CARS, car_id, fields).await? {
            return Err(Error::not_found("car", car_id));
        }
        debug!(car_id, %status, "Set car status");
        Ok(())
    }

    /// Remove a car from the fleet.
    ///
    /// # Errors
    ///
    /// Returns `CarInUse` if an active booking holds the car, or `NotFound`
    /// if it does not exist.
    pub async fn delete_car(&self, car_id: &str) -> Result<()> {
        let _guard = self.booking_lock.lock().await;

        let active = self.active_bookings_for_car(car_id).await?;
        if !active.is_empty() {
            return Err(Error::CarInUse {
                car_id: car_id.to_string(),
            });
        }
        if !self.store.delete(collections::CARS, car_id).await? {
            return Err(Error::not_found("car", car_id));
        }
        info!(car_id, "Deleted car");
        Ok(())
    }

    // === Bookings ===

    async fn active_bookings_for_car(&self, car_id: &str) -> Result<Vec<Booking>> {
        self.load_all(
            collections::BOOKINGS,
            &[
                FieldFilter::eq("car_id", car_id),
                FieldFilter::eq("status", BookingStatus::Active.to_string()),
            ],
        )
        .await
    }

    /// Whether `car_id` is free over `[start, end)`, ignoring the booking
    /// `exclude` if given.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn check_availability(
        &self,
        car_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<&str>,
    ) -> Result<bool> {
        let active = self.active_bookings_for_car(car_id).await?;
        Ok(!active
            .iter()
            .filter(|b| Some(b.booking_id.as_str()) != exclude)
            .any(|b| b.overlaps(start, end)))
    }

    /// Store a booking and mark its car booked.
    ///
    /// The car status and overlap checks and the insert happen under one
    /// lock so two concurrent bookings in this process cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown car, or `CarUnavailable` if the car
    /// is not available or an active booking overlaps the dates.
    pub async fn create_booking(&self, booking: &Booking) -> Result<()> {
        let _guard = self.booking_lock.lock().await;

        let car = self.car(&booking.car_id).await?;
        if !car.is_available()
            || !self
                .check_availability(&booking.car_id, booking.start_date, booking.end_date, None)
                .await?
        {
            return Err(Error::CarUnavailable {
                car_id: booking.car_id.clone(),
            });
        }

        self.store
            .set(collections::BOOKINGS, &booking.booking_id, to_document(booking)?)
            .await?;
        self.set_car_status(&booking.car_id, CarStatus::Booked).await?;

        info!(
            booking_id = %booking.booking_id,
            car_id = %booking.car_id,
            customer_id = %booking.customer_id,
            "Created booking"
        );
        Ok(())
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        self.load(collections::BOOKINGS, booking_id).await
    }

    /// Look up a booking that must exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such booking.
    pub async fn booking(&self, booking_id: &str) -> Result<Booking> {
        self.get_booking(booking_id)
            .await?
            .ok_or_else(|| Error::not_found("booking", booking_id))
    }

    /// Every booking, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_bookings(&self) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self.load_all(collections::BOOKINGS, &[]).await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    /// A customer's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_customer_bookings(&self, customer_id: &str) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .load_all(
                collections::BOOKINGS,
                &[FieldFilter::eq("customer_id", customer_id)],
            )
            .await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    /// Cancel an active booking and release its car.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InvalidTransition` if the booking is not active.
    pub async fn cancel_booking(&self, booking_id: &str) -> Result<Booking> {
        self.finish_booking(booking_id, BookingStatus::Cancelled, "cancel")
            .await
    }

    /// Complete an active booking and release its car.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `InvalidTransition` if the booking is not active.
    pub async fn complete_booking(&self, booking_id: &str) -> Result<Booking> {
        self.finish_booking(booking_id, BookingStatus::Completed, "complete")
            .await
    }

    async fn finish_booking(
        &self,
        booking_id: &str,
        status: BookingStatus,
        action: &'static str,
    ) -> Result<Booking> {
        let _guard = self.booking_lock.lock().await;
        let mut booking = self.booking(booking_id).await?;
        if !booking.is_active() {
            return Err(Error::InvalidTransition {
                booking_id: booking_id.to_string(),
                status: booking.status.to_string(),
                action,
            });
        }

        self.store
            .update(
                collections::BOOKINGS,
                booking_id,
                status_document(status.to_string()),
            )
            .await?;
        booking.status = status;

        // Another active booking may still hold the car.
        if self.active_bookings_for_car(&booking.car_id).await?.is_empty() {
            match self.set_car_status(&booking.car_id, CarStatus::Available).await {
                Err(e) if e.is_not_found() => {
                    warn!(car_id = %booking.car_id, booking_id, "Booked car no longer exists");
                }
                other => other?,
            }
        }

        info!(booking_id, %status, "Booking finished");
        Ok(booking)
    }

    // === Payments ===

    /// Record a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn create_payment(&self, payment: &Payment) -> Result<()> {
        self.store
            .set(collections::PAYMENTS, &payment.payment_id, to_document(payment)?)
            .await?;
        info!(
            payment_id = %payment.payment_id,
            booking_id = %payment.booking_id,
            amount = %payment.amount,
            "Recorded payment"
        );
        Ok(())
    }

    /// Look up a payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        self.load(collections::PAYMENTS, payment_id).await
    }

    /// Every payment, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_payments(&self) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.load_all(collections::PAYMENTS, &[]).await?;
        payments.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));
        Ok(payments)
    }

    /// Payments made against one booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_booking_payments(&self, booking_id: &str) -> Result<Vec<Payment>> {
        self.load_all(
            collections::PAYMENTS,
            &[FieldFilter::eq("booking_id", booking_id)],
        )
        .await
    }

    /// Payments for all of a customer's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn list_customer_payments(&self, customer_id: &str) -> Result<Vec<Payment>> {
        let booking_ids: HashSet<String> = self
            .list_customer_bookings(customer_id)
            .await?
            .into_iter()
            .map(|b| b.booking_id)
            .collect();
        let payments = self.list_payments().await?;
        Ok(payments
            .into_iter()
            .filter(|p| booking_ids.contains(&p.booking_id))
            .collect())
    }

    // === Reports ===

    /// Fleet, booking and revenue totals.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let cars = self.list_cars().await?;
        let bookings: Vec<Booking> = self.load_all(collections::BOOKINGS, &[]).await?;
        let customers = self.list_customers().await?;
        let payments: Vec<Payment> = self.load_all(collections::PAYMENTS, &[]).await?;

        let available_cars = cars.iter().filter(|c| c.is_available()).count();
        Ok(DashboardStats {
            total_cars: cars.len(),
            available_cars,
            booked_cars: cars.len() - available_cars,
            total_bookings: bookings.len(),
            active_bookings: bookings.iter().filter(|b| b.is_active()).count(),
            total_customers: customers.len(),
            total_revenue: payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Completed)
                .map(|p| p.amount)
                .sum(),
        })
    }
}

fn sort_cars(cars: &mut [Car]) {
    cars.sort_by(|a, b| (&a.brand, &a.model).cmp(&(&b.brand, &b.model)));
}

fn status_document(status: String) -> Document {
    let mut fields = Document::new();
    fields.insert("status".to_string(), json!(status));
    fields
}
