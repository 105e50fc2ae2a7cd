//! Login sessions that persist between `carrent` invocations.
//!
//! A successful login writes a small JSON file naming the user. Later
//! commands read it back to know who is acting. Sessions older than the
//! configured TTL are rejected and the file is removed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Role, User};

/// The persisted record of who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Logged-in user.
    pub uid: String,
    /// Their email, for display.
    pub email: String,
    /// Their role at login time.
    pub role: Role,
    /// When they logged in.
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `user` now.
    #[must_use]
    pub fn start(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            role: user.role,
            logged_in_at: Utc::now(),
        }
    }

    /// Whether the session is older than `ttl` at `now`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.logged_in_at >= ttl
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store for the session file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Create a store using the configured path and TTL.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session_path(), config.session_ttl())
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current session.
    ///
    /// Returns `None` if nobody is logged in. A corrupt file is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionExpired` if the session is past its TTL, or an I/O
    /// error if the file cannot be read.
    pub fn load(&self) -> Result<Option<Session>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: Session = match serde_json::from_str(&contents) {
            Ok(session) => session,
            Err(e) => {
                warn!("Discarding unreadable session file {}: {e}", self.path.display());
                self.clear()?;
                return Ok(None);
            }
        };

        if session.is_expired(self.ttl, Utc::now()) {
            debug!(uid = %session.uid, "Session expired");
            self.clear()?;
            return Err(Error::SessionExpired);
        }
        Ok(Some(session))
    }

    /// Persist a session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        debug!(uid = %session.uid, "Saved session to {}", self.path.display());
        Ok(())
    }

    /// Remove the session file. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
