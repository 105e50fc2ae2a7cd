//! First-run data: the default admin account and a sample fleet.

use chrono::NaiveDate;
use tracing::{error, info};

use crate::auth::{AuthManager, NewUser};
use crate::config::SeedConfig;
use crate::error::Result;
use crate::models::{NewCar, Role};
use crate::money::Money;
use crate::repository::Repository;

/// What [`setup_initial_data`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Whether the default admin was created.
    pub admin_created: bool,
    /// Sample cars added.
    pub cars_added: usize,
    /// Sample cars that could not be added.
    pub cars_failed: usize,
}

/// The sample fleet: brand, model, year, daily rate (₹), colour, fuel, seats.
const SAMPLE_CARS: &[(&str, &str, i32, i64, &str, &str, u32)] = &[
    ("Toyota", "Fortuner", 2023, 3500, "Pearl White", "Diesel", 7),
    ("Honda", "City", 2024, 2000, "Silver", "Petrol", 5),
    ("Hyundai", "Creta", 2023, 2500, "Red", "Petrol", 5),
    ("Maruti", "Swift", 2024, 1500, "Blue", "Petrol", 5),
    ("Mahindra", "Thar", 2023, 3000, "Black", "Diesel", 4),
    ("Kia", "Seltos", 2024, 2800, "White", "Diesel", 5),
];

/// The sample fleet as new-car records.
#[must_use]
pub fn sample_cars() -> Vec<NewCar> {
    SAMPLE_CARS
        .iter()
        .map(|&(brand, model, year, rupees, color, fuel, seats)| NewCar {
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            daily_rate: Money::from_rupees(rupees),
            color: color.to_string(),
            fuel_type: fuel.to_string(),
            seats,
            image_url: String::new(),
        })
        .collect()
}

/// Create the default admin if missing and add the sample fleet if there
/// are no cars.
///
/// # Errors
///
/// Returns an error if the admin cannot be created or the store cannot be
/// read. Individual car failures are logged and counted instead.
pub async fn setup_initial_data(
    repo: &Repository,
    auth: &AuthManager,
    seed: &SeedConfig,
    today: NaiveDate,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if repo.get_user_by_email(&seed.admin_email).await?.is_none() {
        auth.register(NewUser {
            email: seed.admin_email.clone(),
            password: seed.admin_password.clone(),
            name: seed.admin_name.clone(),
            role: Role::Admin,
            phone: seed.admin_phone.clone(),
            address: seed.admin_address.clone(),
        })
        .await?;
        info!(email = %seed.admin_email, "Created default admin");
        report.admin_created = true;
    }

    if seed.sample_cars && repo.list_cars().await?.is_empty() {
        for car in sample_cars() {
            let name = format!("{} {}", car.brand, car.model);
            match repo.add_car(car, today).await {
                Ok(_) => report.cars_added += 1,
                Err(e) => {
                    error!(car = %name, "Failed to add sample car: {e}");
                    report.cars_failed += 1;
                }
            }
        }
        info!(added = report.cars_added, "Added sample cars");
    }

    Ok(report)
}
