//! Configuration management for carrental.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. The
//! Firebase environment variables are read verbatim into the `[cloud]`
//! section.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "carrental";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "rental.db";

/// Default session file name.
const SESSION_FILE_NAME: &str = "session.json";

/// Environment variable holding the service-account key path.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable holding the Firebase project id.
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables prefixed with `CARRENTAL_` (`__` separates sections)
/// 2. `FIREBASE_*` and `GOOGLE_APPLICATION_CREDENTIALS` environment variables
/// 3. TOML config file at `~/.config/carrental/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Firebase / Firestore connection settings.
    pub cloud: CloudConfig,
    /// Login session configuration.
    pub session: SessionConfig,
    /// Change feed configuration.
    pub sync: SyncConfig,
    /// Initial data configuration.
    pub seed: SeedConfig,
}

/// Which document store backs the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local `SQLite` file.
    #[default]
    Sqlite,
    /// Google Cloud Firestore.
    Firestore,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Firestore => write!(f, "firestore"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Document store backend.
    pub backend: StorageBackend,
    /// Path to the `SQLite` database file.
    /// Defaults to `~/.local/share/carrental/rental.db`
    pub database_path: Option<PathBuf>,
}

/// Firebase project settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// `FIREBASE_API_KEY`.
    #[serde(deserialize_with = "lenient_string")]
    pub api_key: Option<String>,
    /// `FIREBASE_AUTH_DOMAIN`.
    #[serde(deserialize_with = "lenient_string")]
    pub auth_domain: Option<String>,
    /// `FIREBASE_DATABASE_URL`.
    #[serde(deserialize_with = "lenient_string")]
    pub database_url: Option<String>,
    /// `FIREBASE_PROJECT_ID`.
    #[serde(deserialize_with = "lenient_string")]
    pub project_id: Option<String>,
    /// `FIREBASE_STORAGE_BUCKET`.
    #[serde(deserialize_with = "lenient_string")]
    pub storage_bucket: Option<String>,
    /// `FIREBASE_MESSAGING_SENDER_ID`.
    #[serde(deserialize_with = "lenient_string")]
    pub messaging_sender_id: Option<String>,
    /// `FIREBASE_APP_ID`.
    #[serde(deserialize_with = "lenient_string")]
    pub app_id: Option<String>,
    /// `GOOGLE_APPLICATION_CREDENTIALS`: service-account key file.
    pub credentials_path: Option<PathBuf>,
    /// `host:port` of a Firestore emulator. Skips authentication when set.
    pub emulator_host: Option<String>,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Login session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the logged-in session is kept.
    /// Defaults to `~/.local/share/carrental/session.json`
    pub path: Option<PathBuf>,
    /// Hours before a session must be renewed.
    pub ttl_hours: u32,
}

/// Change feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between store polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Collections watched by `carrent watch`.
    pub collections: Vec<String>,
}

/// Initial data configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Create the default admin and sample cars on `carrent init`.
    pub enabled: bool,
    /// Default admin email.
    pub admin_email: String,
    /// Default admin password.
    pub admin_password: String,
    /// Default admin name.
    pub admin_name: String,
    /// Default admin phone.
    pub admin_phone: String,
    /// Default admin address.
    pub admin_address: String,
    /// Add the sample fleet when no cars exist.
    pub sample_cars: bool,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            auth_domain: None,
            database_url: None,
            project_id: None,
            storage_bucket: None,
            messaging_sender_id: None,
            app_id: None,
            credentials_path: None,
            emulator_host: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: None, // Will be resolved to default at runtime
            ttl_hours: 12,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            collections: vec!["cars".to_string(), "bookings".to_string()],
        }
    }
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_email: "admin@carrental.com".to_string(),
            admin_password: "admin123".to_string(),
            admin_name: "Administrator".to_string(),
            admin_phone: "9876543210".to_string(),
            admin_address: "Head Office, Mumbai".to_string(),
            sample_cars: true,
        }
    }
}

/// Accept numbers where strings are expected; figment parses env values
/// like `FIREBASE_MESSAGING_SENDER_ID=1234` as integers.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
        Float(f64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    }))
}

impl CloudConfig {
    /// Environment variable names of settings the Firestore backend needs
    /// but which are not set.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project_id.as_deref().map_or(true, str::is_empty) {
            missing.push(PROJECT_ID_ENV);
        }
        if self.emulator_host.is_none() && self.credentials_path.is_none() {
            missing.push(CREDENTIALS_ENV);
        }
        missing
    }

    /// Check that everything the Firestore backend needs is present.
    ///
    /// # Errors
    ///
    /// Returns an error naming every missing setting, or if the credential
    /// file does not exist.
    pub fn require_firestore(&self) -> Result<()> {
        let missing = self.missing_keys();
        if !missing.is_empty() {
            return Err(Error::MissingCloudSettings { keys: missing });
        }
        if self.emulator_host.is_none() {
            if let Some(path) = &self.credentials_path {
                if !path.exists() {
                    return Err(Error::CredentialsFileNotFound { path: path.clone() });
                }
            }
        }
        Ok(())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::figment(config_path).extract::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment without extracting it.
    #[must_use]
    pub fn figment(config_path: Option<PathBuf>) -> Figment {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(
                Env::prefixed("FIREBASE_")
                    .map(|key| format!("cloud.{}", key.as_str().to_ascii_lowercase()).into()),
            )
            .merge(
                Env::raw()
                    .only(&[CREDENTIALS_ENV])
                    .map(|_| "cloud.credentials_path".into()),
            )
            .merge(Env::prefixed("CARRENTAL_").split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.sync.poll_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.session.ttl_hours == 0 {
            return Err(Error::ConfigValidation {
                message: "session ttl_hours must be greater than 0".to_string(),
            });
        }

        if self.cloud.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.storage.backend == StorageBackend::Firestore {
            self.cloud.require_firestore()?;
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session file path, resolving defaults if not set.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_FILE_NAME))
    }

    /// Get the session lifetime as a chrono Duration.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session.ttl_hours))
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.storage.database_path.is_none());
        assert!(config.cloud.project_id.is_none());
        assert!(config.seed.enabled);
        assert!(config.seed.sample_cars);
    }

    #[test]
    fn test_default_seed_config() {
        let seed = SeedConfig::default();
        assert_eq!(seed.admin_email, "admin@carrental.com");
        assert_eq!(seed.admin_password, "admin123");
        assert_eq!(seed.admin_phone, "9876543210");
    }

    #[test]
    fn test_default_sync_config() {
        let sync = SyncConfig::default();
        assert_eq!(sync.poll_interval_ms, 2_000);
        assert_eq!(sync.collections, vec!["cars", "bookings"]);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = Config::default();
        config.sync.poll_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.session.ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_firestore_requires_project_and_credentials() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Firestore;

        let err = config.validate().unwrap_err();
        match err {
            Error::MissingCloudSettings { keys } => {
                assert_eq!(keys, vec![PROJECT_ID_ENV, CREDENTIALS_ENV]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_firestore_credentials_file_must_exist() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Firestore;
        config.cloud.project_id = Some("rental-demo".to_string());
        config.cloud.credentials_path = Some(PathBuf::from("/nonexistent/serviceAccountKey.json"));

        assert!(matches!(
            config.validate(),
            Err(Error::CredentialsFileNotFound { .. })
        ));
    }

    #[test]
    fn test_firestore_emulator_needs_no_credentials() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Firestore;
        config.cloud.project_id = Some("demo-rental".to_string());
        config.cloud.emulator_host = Some("localhost:8080".to_string());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("rental.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_session_path_default() {
        let config = Config::default();
        assert!(config.session_path().to_string_lossy().contains("session.json"));
    }

    #[test]
    fn test_session_ttl() {
        assert_eq!(Config::default().session_ttl(), chrono::Duration::hours(12));
    }

    #[test]
    fn test_poll_interval() {
        assert_eq!(Config::default().poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("carrental"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_from_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [storage]
                database_path = "/tmp/fleet.db"

                [seed]
                sample_cars = false
                "#,
            )?;
            jail.set_env("FIREBASE_PROJECT_ID", "rental-demo");
            jail.set_env("FIREBASE_MESSAGING_SENDER_ID", "123456789");
            jail.set_env("GOOGLE_APPLICATION_CREDENTIALS", "/keys/sa.json");
            jail.set_env("CARRENTAL_SYNC__POLL_INTERVAL_MS", "500");

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.database_path(), PathBuf::from("/tmp/fleet.db"));
            assert!(!config.seed.sample_cars);
            assert_eq!(config.cloud.project_id.as_deref(), Some("rental-demo"));
            assert_eq!(
                config.cloud.messaging_sender_id.as_deref(),
                Some("123456789")
            );
            assert_eq!(
                config.cloud.credentials_path,
                Some(PathBuf::from("/keys/sa.json"))
            );
            assert_eq!(config.sync.poll_interval_ms, 500);
            Ok(())
        });
    }

    #[test]
    fn test_toml_sections_select_backend_and_ttl() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [storage]
                backend = "firestore"

                [session]
                ttl_hours = 3

                [cloud]
                project_id = "rental-demo"
                emulator_host = "localhost:8080"
                "#,
            )?;

            let config = Config::load_from(Some(PathBuf::from("config.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.storage.backend, StorageBackend::Firestore);
            assert_eq!(config.session.ttl_hours, 3);
            assert_eq!(config.cloud.emulator_host.as_deref(), Some("localhost:8080"));
            Ok(())
        });
    }

    #[test]
    fn test_load_nonexistent_config_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.storage, StorageConfig::default());
            assert_eq!(config.seed, SeedConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_storage_backend_serde() {
        let json = serde_json::to_string(&StorageBackend::Firestore).unwrap();
        assert_eq!(json, "\"firestore\"");
        assert_eq!(StorageBackend::Sqlite.to_string(), "sqlite");
    }

    #[test]
    fn test_cloud_config_deserialize_numbers_as_strings() {
        let json = r#"{"messaging_sender_id": 42, "app_id": "1:42:web:abc"}"#;
        let cloud: CloudConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cloud.messaging_sender_id.as_deref(), Some("42"));
        assert_eq!(cloud.app_id.as_deref(), Some("1:42:web:abc"));
        assert_eq!(cloud.request_timeout_secs, 30);
    }
}
