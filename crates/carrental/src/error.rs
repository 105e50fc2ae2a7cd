//! Error types for carrental.
//!
//! This module defines all error types used throughout the carrental crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for carrental operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Cloud settings required by the selected backend are absent.
    #[error("missing cloud settings: {}", keys.join(", "))]
    MissingCloudSettings {
        /// Environment variable names of the missing settings.
        keys: Vec<&'static str>,
    },

    /// The service-account credential file does not exist.
    #[error("service account credentials not found at {path}")]
    CredentialsFileNotFound {
        /// Where the file was expected.
        path: PathBuf,
    },

    // === Cloud Errors ===
    /// The cloud document service rejected a request.
    #[error("cloud request failed ({status}): {message}")]
    Cloud {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the service.
        message: String,
    },

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to sign the service-account assertion.
    #[error("failed to sign service account token: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    /// A document could not be translated to or from the store's format.
    #[error("malformed document {collection}/{id}: {message}")]
    MalformedDocument {
        /// Collection name.
        collection: String,
        /// Document id.
        id: String,
        /// What was wrong.
        message: String,
    },

    // === Auth Errors ===
    /// Email or password did not match.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A user exists but has no stored credential.
    #[error("authentication data not found for {email}")]
    CredentialsMissing {
        /// The user's email.
        email: String,
    },

    /// An account with this email already exists.
    #[error("email already registered: {email}")]
    EmailTaken {
        /// The duplicate email.
        email: String,
    },

    /// The command needs a logged-in user.
    #[error("not logged in; run `carrent login` first")]
    NotLoggedIn,

    /// The saved session is older than the configured TTL.
    #[error("session expired; log in again")]
    SessionExpired,

    /// The current user lacks the required role.
    #[error("permission denied: {action} requires an admin account")]
    Forbidden {
        /// What was attempted.
        action: String,
    },

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    // === Domain Errors ===
    /// Input failed a business rule.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the rule that failed.
        message: String,
    },

    /// A record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind ("car", "booking", ...).
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The car already has an active booking overlapping the dates.
    #[error("car {car_id} is not available for the selected dates")]
    CarUnavailable {
        /// The requested car.
        car_id: String,
    },

    /// The car cannot be removed while it has active bookings.
    #[error("car {car_id} has active bookings and cannot be deleted")]
    CarInUse {
        /// The car.
        car_id: String,
    },

    /// A booking status change is not allowed from its current status.
    #[error("cannot {action} booking {booking_id}: status is {status}")]
    InvalidTransition {
        /// The booking.
        booking_id: String,
        /// Its current status.
        status: String,
        /// The attempted action.
        action: &'static str,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for carrental operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a validation error for a field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a permission error for an admin-only action.
    #[must_use]
    pub fn forbidden(action: impl Into<String>) -> Self {
        Self::Forbidden {
            action: action.into(),
        }
    }

    /// Check if this error means a record was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is an authentication or authorization failure.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::CredentialsMissing { .. }
                | Self::NotLoggedIn
                | Self::SessionExpired
                | Self::Forbidden { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidCredentials;
        assert_eq!(err.to_string(), "invalid email or password");

        let err = Error::not_found("car", "CAR_1234ABCD");
        assert_eq!(err.to_string(), "car not found: CAR_1234ABCD");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::not_found("booking", "BOOK_1").is_not_found());
        assert!(!Error::InvalidCredentials.is_not_found());
    }

    #[test]
    fn test_is_auth_error() {
        assert!(Error::InvalidCredentials.is_auth_error());
        assert!(Error::NotLoggedIn.is_auth_error());
        assert!(Error::SessionExpired.is_auth_error());
        assert!(Error::forbidden("delete car").is_auth_error());
        assert!(!Error::not_found("car", "x").is_auth_error());
    }

    #[test]
    fn test_forbidden_display() {
        let msg = Error::forbidden("add car").to_string();
        assert!(msg.contains("add car"));
        assert!(msg.contains("admin"));
    }

    #[test]
    fn test_missing_cloud_settings_lists_keys() {
        let err = Error::MissingCloudSettings {
            keys: vec!["FIREBASE_PROJECT_ID", "GOOGLE_APPLICATION_CREDENTIALS"],
        };
        let msg = err.to_string();
        assert!(msg.contains("FIREBASE_PROJECT_ID, GOOGLE_APPLICATION_CREDENTIALS"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = Error::validation("seats", "must be between 1 and 50");
        assert_eq!(err.to_string(), "invalid seats: must be between 1 and 50");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = Error::InvalidTransition {
            booking_id: "BOOK_1".to_string(),
            status: "Cancelled".to_string(),
            action: "complete",
        };
        assert_eq!(
            err.to_string(),
            "cannot complete booking BOOK_1: status is Cancelled"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_cloud_error_display() {
        let err = Error::Cloud {
            status: 403,
            message: "PERMISSION_DENIED".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("PERMISSION_DENIED"));
    }

    #[test]
    fn test_credentials_file_not_found_display() {
        let err = Error::CredentialsFileNotFound {
            path: PathBuf::from("/keys/serviceAccountKey.json"),
        };
        assert!(err.to_string().contains("/keys/serviceAccountKey.json"));
    }
}
