//! Command handlers for the `carrent` binary.
//!
//! [`App`] ties the configuration, repository and login state together and
//! turns each parsed [`Command`] into text for stdout.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::{AuthManager, NewUser};
use crate::cli::{
    BookingsCommand, CarsCommand, Command, ConfigCommand, CustomersCommand, EditCarArgs,
    PaymentsCommand, RegisterCommand, WatchCommand,
};
use crate::config::{Config, StorageBackend};
use crate::display;
use crate::error::{Error, Result};
use crate::models::{CarUpdate, NewCar, Payment, Role, User};
use crate::rental::{self, BookingRequest};
use crate::repository::Repository;
use crate::seed;
use crate::session::SessionStore;
use crate::storage::{collections, open_store, DocumentStore};
use crate::sync::ChangeWatcher;

/// Buffered change events between the watcher task and the printer.
const WATCH_BUFFER: usize = 64;

/// Today's date on the local clock.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Use `password` if given, otherwise prompt on stderr and read a line
/// from stdin.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Handle `carrent config ...`. Needs no store.
///
/// # Errors
///
/// Returns an error if the configuration to validate is invalid.
pub fn config_command(config: &Config, cmd: ConfigCommand) -> Result<String> {
    match cmd {
        ConfigCommand::Show { json } => display::render_config(config, json),
        ConfigCommand::Path => Ok(Config::default_config_path().display().to_string()),
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            Config::load_from(Some(path.clone()))?;
            Ok(format!("Configuration is valid: {}", path.display()))
        }
    }
}

/// A running `carrent` invocation.
#[derive(Debug)]
pub struct App {
    config: Config,
    repo: Repository,
    auth: AuthManager,
    session_expired: bool,
}

impl App {
    /// Open the configured store and pick up any saved session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or read.
    pub async fn open(config: Config) -> Result<Self> {
        let store = open_store(&config)?;
        Self::with_store(config, store).await
    }

    /// Like [`App::open`] but over an existing store.
    ///
    /// An expired session is remembered and reported by the first command
    /// that needs a login.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let repo = Repository::new(store);
        let mut auth = AuthManager::new(repo.clone(), SessionStore::from_config(&config));
        let session_expired = match auth.restore().await {
            Ok(_) => false,
            Err(Error::SessionExpired) => {
                info!("Saved session has expired");
                true
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            config,
            repo,
            auth,
            session_expired,
        })
    }

    /// The repository in use.
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.auth.current_user()
    }

    fn user(&self) -> Result<&User> {
        if self.session_expired && !self.auth.is_logged_in() {
            return Err(Error::SessionExpired);
        }
        self.auth.require_login()
    }

    fn admin(&self, action: &str) -> Result<&User> {
        self.user()?;
        self.auth.require_admin(action)
    }

    /// Run one command and return what it prints.
    ///
    /// `watch` streams to stdout until interrupted and returns nothing.
    ///
    /// # Errors
    ///
    /// Returns the first error the command hits.
    pub async fn execute(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Init { no_sample_cars } => self.init(no_sample_cars).await,
            Command::Login { email, password } => {
                let password = password_or_prompt(password)?;
                self.login(&email, &password).await
            }
            Command::Logout => self.logout(),
            Command::Register(cmd) => self.register(cmd).await,
            Command::Whoami => Ok(display::render_user(self.user()?)),
            Command::Cars(cmd) => self.cars(cmd).await,
            Command::Bookings(cmd) => self.bookings(cmd).await,
            Command::Payments(cmd) => self.payments(cmd).await,
            Command::Customers(CustomersCommand::List { format }) => {
                self.admin("list customers")?;
                display::render_customers(&self.repo.list_customers().await?, format)
            }
            Command::Stats { json } => {
                self.admin("view dashboard")?;
                display::render_stats(&self.repo.dashboard_stats().await?, json)
            }
            Command::Status(cmd) => self.status(cmd.json).await,
            Command::Watch(cmd) => {
                self.watch(cmd).await?;
                Ok(String::new())
            }
            Command::Config(cmd) => config_command(&self.config, cmd),
        }
    }

    async fn init(&self, no_sample_cars: bool) -> Result<String> {
        if !self.config.seed.enabled {
            return Ok("Initial data setup is disabled (seed.enabled = false).".to_string());
        }

        let mut seed = self.config.seed.clone();
        seed.sample_cars &= !no_sample_cars;
        let report = seed::setup_initial_data(&self.repo, &self.auth, &seed, today()).await?;

        let mut lines = Vec::new();
        if report.admin_created {
            lines.push(format!("Created admin account {}", seed.admin_email));
        } else {
            lines.push(format!("Admin account {} already exists", seed.admin_email));
        }
        if report.cars_added > 0 || report.cars_failed > 0 {
            lines.push(format!("Added {} sample car(s)", report.cars_added));
        }
        if report.cars_failed > 0 {
            lines.push(format!("{} sample car(s) could not be added", report.cars_failed));
        }
        Ok(lines.join("\n"))
    }

    /// Log in as `email`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for a wrong email or password.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String> {
        let user = self.auth.login(email, password).await?;
        let message = format!("Logged in as {} ({})", user.name, user.role);
        self.session_expired = false;
        Ok(message)
    }

    fn logout(&mut self) -> Result<String> {
        self.auth.logout()?;
        self.session_expired = false;
        Ok("Logged out".to_string())
    }

    async fn register(&self, cmd: RegisterCommand) -> Result<String> {
        let password = password_or_prompt(cmd.password)?;
        let user = self
            .auth
            .register(NewUser {
                email: cmd.email,
                password,
                name: cmd.name,
                role: Role::Customer,
                phone: cmd.phone,
                address: cmd.address,
            })
            .await?;
        Ok(format!(
            "Registered {} ({}). Log in with `carrent login {}`",
            user.email, user.uid, user.email
        ))
    }

    async fn cars(&self, cmd: CarsCommand) -> Result<String> {
        match cmd {
            CarsCommand::List { available, format } => {
                self.user()?;
                let cars = if available {
                    self.repo.list_available_cars().await?
                } else {
                    self.repo.list_cars().await?
                };
                display::render_cars(&cars, format)
            }
            CarsCommand::Show { car_id, format } => {
                self.user()?;
                display::render_car(&self.repo.car(&car_id).await?, format)
            }
            CarsCommand::Add(args) => {
                self.admin("add car")?;
                let car = self
                    .repo
                    .add_car(
                        NewCar {
                            brand: args.brand,
                            model: args.model,
                            year: args.year,
                            daily_rate: args.rate,
                            color: args.color,
                            fuel_type: args.fuel,
                            seats: args.seats,
                            image_url: args.image_url,
                        },
                        today(),
                    )
                    .await?;
                Ok(format!("Added {} {}", car.car_id, car.display_name()))
            }
            CarsCommand::Edit(args) => {
                self.admin("edit car")?;
                let (car_id, update) = car_update(args);
                if update.is_empty() {
                    return Err(Error::validation("update", "nothing to change"));
                }
                let car = self.repo.update_car(&car_id, &update, today()).await?;
                Ok(format!("Updated {} {}", car.car_id, car.display_name()))
            }
            CarsCommand::Delete { car_id } => {
                self.admin("delete car")?;
                self.repo.delete_car(&car_id).await?;
                Ok(format!("Deleted {car_id}"))
            }
        }
    }

    async fn bookings(&self, cmd: BookingsCommand) -> Result<String> {
        match cmd {
            BookingsCommand::List { active, format } => {
                let user = self.user()?;
                let mut bookings = if user.is_admin() {
                    self.repo.list_bookings().await?
                } else {
                    self.repo.list_customer_bookings(&user.uid).await?
                };
                if active {
                    bookings.retain(crate::models::Booking::is_active);
                }
                display::render_bookings(&bookings, format)
            }
            BookingsCommand::Show { booking_id, format } => {
                let booking = self.visible_booking(&booking_id).await?;
                let payments = self.repo.list_booking_payments(&booking_id).await?;
                display::render_booking(&booking, &payments, format)
            }
            BookingsCommand::Create {
                car_id,
                start,
                end,
                quote,
            } => {
                let user = self.user()?;
                let request = BookingRequest {
                    car_id,
                    start_date: start,
                    end_date: end,
                };
                if quote {
                    let quote = rental::quote(&self.repo, &request, today()).await?;
                    return Ok(format!(
                        "{} day(s) for {}",
                        quote.days,
                        crate::pricing::format_currency(quote.total)
                    ));
                }
                let receipt = rental::book_car(&self.repo, user, &request, today()).await?;
                Ok(format!(
                    "Booked {} as {}\nPaid {} online (payment {})",
                    receipt.booking.car_info,
                    receipt.booking.booking_id,
                    receipt.payment.amount,
                    receipt.payment.payment_id
                ))
            }
            BookingsCommand::Cancel { booking_id } => {
                self.visible_booking(&booking_id).await?;
                let booking = self.repo.cancel_booking(&booking_id).await?;
                Ok(format!("Cancelled {}", booking.booking_id))
            }
            BookingsCommand::Complete { booking_id } => {
                self.admin("complete booking")?;
                let booking = self.repo.complete_booking(&booking_id).await?;
                Ok(format!("Completed {}", booking.booking_id))
            }
        }
    }

    /// A booking the current user may see: any for admins, their own for
    /// customers. Other customers' bookings read as not found.
    async fn visible_booking(&self, booking_id: &str) -> Result<crate::models::Booking> {
        let user = self.user()?;
        let booking = self.repo.booking(booking_id).await?;
        if !user.is_admin() && booking.customer_id != user.uid {
            debug!(booking_id, uid = %user.uid, "Hid another customer's booking");
            return Err(Error::not_found("booking", booking_id));
        }
        Ok(booking)
    }

    async fn payments(&self, cmd: PaymentsCommand) -> Result<String> {
        match cmd {
            PaymentsCommand::List { booking, format } => {
                let payments = match booking {
                    Some(booking_id) => {
                        self.visible_booking(&booking_id).await?;
                        self.repo.list_booking_payments(&booking_id).await?
                    }
                    None => {
                        let user = self.user()?;
                        if user.is_admin() {
                            self.repo.list_payments().await?
                        } else {
                            self.repo.list_customer_payments(&user.uid).await?
                        }
                    }
                };
                display::render_payments(&payments, format)
            }
            PaymentsCommand::Record {
                booking_id,
                amount,
                method,
            } => {
                self.admin("record payment")?;
                if !amount.is_positive() {
                    return Err(Error::validation("amount", "must be greater than zero"));
                }
                let booking = self.repo.booking(&booking_id).await?;
                let payment = Payment::completed(&booking.booking_id, amount, method.into());
                self.repo.create_payment(&payment).await?;
                Ok(format!(
                    "Recorded {} {} for {} ({})",
                    payment.payment_method, payment.amount, booking.booking_id, payment.payment_id
                ))
            }
        }
    }

    async fn status(&self, as_json: bool) -> Result<String> {
        let store = self.repo.store();
        let local = store.storage_stats()?;
        let mut counts = Vec::with_capacity(collections::ALL.len());
        for collection in collections::ALL {
            let n = match &local {
                Some(stats) => stats.collections.get(*collection).copied().unwrap_or(0),
                None => i64::try_from(store.list(collection).await?.len()).unwrap_or(i64::MAX),
            };
            counts.push((*collection, n));
        }
        let database = (self.config.storage.backend == StorageBackend::Sqlite)
            .then(|| self.config.database_path());
        let db_size = local.as_ref().map(|stats| stats.db_size_bytes);
        let user = self.auth.current_user();

        if as_json {
            let documents: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(name, n)| ((*name).to_string(), json!(n)))
                .collect();
            let status = json!({
                "backend": store.backend(),
                "database_path": database,
                "database_size_bytes": db_size,
                "project_id": self.config.cloud.project_id,
                "documents": documents,
                "logged_in_as": user.map(|u| &u.email),
                "session_expired": self.session_expired,
            });
            return Ok(serde_json::to_string_pretty(&status)?);
        }

        let mut lines = vec![
            "carrent status".to_string(),
            "--------------".to_string(),
            format!("Backend:       {}", store.backend()),
        ];
        if let Some(path) = database {
            lines.push(format!("Database:      {}", path.display()));
        }
        if let Some(bytes) = db_size {
            lines.push(format!("Size:          {bytes} bytes"));
        }
        if let Some(project) = &self.config.cloud.project_id {
            lines.push(format!("Project:       {project}"));
        }
        lines.push(match (user, self.session_expired) {
            (Some(u), _) => format!("Logged in as:  {} ({})", u.email, u.role),
            (None, true) => "Logged in as:  (session expired)".to_string(),
            (None, false) => "Logged in as:  (nobody)".to_string(),
        });
        lines.push(String::new());
        for (name, n) in counts {
            lines.push(format!("{name:<14} {n}"));
        }
        Ok(lines.join("\n"))
    }

    async fn watch(&self, cmd: WatchCommand) -> Result<()> {
        self.user()?;
        let collections = if cmd.collections.is_empty() {
            self.config.sync.collections.clone()
        } else {
            cmd.collections
        };
        let interval = cmd
            .interval_ms
            .map_or_else(|| self.config.poll_interval(), Duration::from_millis);
        if interval.is_zero() {
            return Err(Error::validation("interval", "must be greater than 0"));
        }

        println!(
            "Watching {} every {}ms (Ctrl-C to stop)",
            collections.join(", "),
            interval.as_millis()
        );
        let watcher = ChangeWatcher::new(Arc::clone(self.repo.store()), collections, interval);
        let (handle, mut events, task) = watcher.spawn(WATCH_BUFFER);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => println!("{}", display::render_event(&event)),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watcher");
                    break;
                }
            }
        }

        handle.stop();
        drop(events);
        task.await
            .map_err(|e| Error::internal(format!("watcher task failed: {e}")))?;
        Ok(())
    }
}

fn car_update(args: EditCarArgs) -> (String, CarUpdate) {
    let update = CarUpdate {
        brand: args.brand,
        model: args.model,
        year: args.year,
        daily_rate: args.rate,
        status: args.status.map(Into::into),
        color: args.color,
        fuel_type: args.fuel,
        seats: args.seats,
        image_url: args.image_url,
    };
    (args.car_id, update)
}
