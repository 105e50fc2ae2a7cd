//! Registration, login and role checks.
//!
//! Password hashes live in the `auth` collection, keyed by user id, apart
//! from the user profiles. Hashes are argon2 PHC strings.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{generate_id, Role, User, USER_ID_PREFIX};
use crate::repository::Repository;
use crate::session::{Session, SessionStore};
use crate::storage::{collections, from_document, to_document};
use crate::validation;

/// Details for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Plain-text password; only its hash is stored.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Account role.
    pub role: Role,
    /// Contact phone, may be empty.
    pub phone: String,
    /// Postal address, may be empty.
    pub address: String,
}

/// A stored password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Credential {
    email: String,
    password_hash: String,
}

/// Hash a password into an argon2 PHC string with a fresh salt.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check a password against a PHC string.
///
/// # Errors
///
/// Returns an error if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Tracks who is logged in and guards role-restricted actions.
#[derive(Debug)]
pub struct AuthManager {
    repo: Repository,
    sessions: SessionStore,
    current: Option<User>,
}

impl AuthManager {
    /// Create a manager with nobody logged in.
    #[must_use]
    pub fn new(repo: Repository, sessions: SessionStore) -> Self {
        Self {
            repo,
            sessions,
            current: None,
        }
    }

    /// Pick up the session saved by an earlier `login`.
    ///
    /// A session whose user has since been deleted is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` for an expired session, or an error if the
    /// store cannot be read.
    pub async fn restore(&mut self) -> Result<Option<&User>> {
        let Some(session) = self.sessions.load()? else {
            return Ok(None);
        };

        match self.repo.get_user(&session.uid).await? {
            Some(user) => {
                debug!(uid = %user.uid, "Restored session");
                self.current = Some(user);
            }
            None => {
                warn!(uid = %session.uid, "Session user no longer exists");
                self.sessions.clear()?;
                self.current = None;
            }
        }
        Ok(self.current.as_ref())
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad email, phone, name or password,
    /// or `EmailTaken` if the email is already registered.
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        let email = new_user.email.trim().to_lowercase();
        validation::validate_email(&email)?;
        if new_user.name.trim().is_empty() {
            return Err(Error::validation("name", "is required"));
        }
        if !new_user.phone.trim().is_empty() {
            validation::validate_phone(&new_user.phone)?;
        }
        validation::validate_password(&new_user.password)?;

        if self.repo.get_user_by_email(&email).await?.is_some() {
            return Err(Error::EmailTaken { email });
        }

        let user = User {
            uid: generate_id(USER_ID_PREFIX),
            email: email.clone(),
            name: new_user.name.trim().to_string(),
            role: new_user.role,
            phone: new_user.phone.trim().to_string(),
            address: new_user.address.trim().to_string(),
            created_at: Utc::now(),
        };
        let credential = Credential {
            email,
            password_hash: hash_password(&new_user.password)?,
        };

        self.repo
            .create_account(&user, to_document(&credential)?)
            .await?;

        info!(uid = %user.uid, role = %user.role, "Registered user");
        Ok(user)
    }

    /// Log in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or a wrong password,
    /// and `CredentialsMissing` if the account has no stored password.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&User> {
        let Some(user) = self.repo.get_user_by_email(email).await? else {
            debug!("Login failed: unknown email");
            return Err(Error::InvalidCredentials);
        };

        let Some(fields) = self.repo.store().get(collections::AUTH, &user.uid).await? else {
            return Err(Error::CredentialsMissing { email: user.email });
        };
        let credential: Credential = from_document(collections::AUTH, &user.uid, fields)?;

        if !verify_password(password, &credential.password_hash)? {
            debug!(uid = %user.uid, "Login failed: wrong password");
            return Err(Error::InvalidCredentials);
        }

        self.sessions.save(&Session::start(&user))?;
        info!(uid = %user.uid, role = %user.role, "Logged in");
        Ok(self.current.insert(user))
    }

    /// Log out and remove the saved session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be removed.
    pub fn logout(&mut self) -> Result<()> {
        if let Some(user) = self.current.take() {
            info!(uid = %user.uid, "Logged out");
        }
        self.sessions.clear()?;
        Ok(())
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the logged-in user is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current.as_ref().is_some_and(User::is_admin)
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// The logged-in user.
    ///
    /// # Errors
    ///
    /// Returns `NotLoggedIn` if nobody is logged in.
    pub fn require_login(&self) -> Result<&User> {
        self.current.as_ref().ok_or(Error::NotLoggedIn)
    }

    /// The logged-in user, who must be an admin to perform `action`.
    ///
    /// # Errors
    ///
    /// Returns `NotLoggedIn` or `Forbidden`.
    pub fn require_admin(&self, action: &str) -> Result<&User> {
        let user = self.require_login()?;
        if !user.is_admin() {
            return Err(Error::forbidden(action));
        }
        Ok(user)
    }
}
