//! Document storage for carrental.
//!
//! Records live in named collections of JSON documents. The
//! [`DocumentStore`] trait is implemented by a local `SQLite` store and by a
//! Firestore REST client, so everything above this layer is unaware of
//! where the data is kept.

pub mod codec;
pub mod firestore;
pub mod migrations;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::error::{Error, Result};

pub use firestore::FirestoreStore;
pub use sqlite::{SqliteStore, StorageStats};

/// Collection names.
pub mod collections {
    /// Registered accounts.
    pub const USERS: &str = "users";
    /// Password hashes, keyed by user id.
    pub const AUTH: &str = "auth";
    /// The rental fleet.
    pub const CARS: &str = "cars";
    /// Rentals.
    pub const BOOKINGS: &str = "bookings";
    /// Payments against bookings.
    pub const PAYMENTS: &str = "payments";

    /// Every collection the application writes.
    pub const ALL: &[&str] = &[USERS, AUTH, CARS, BOOKINGS, PAYMENTS];
}

/// The fields of one document.
pub type Document = serde_json::Map<String, Value>;

/// A document together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document identifier within its collection.
    pub id: String,
    /// Document fields.
    pub fields: Document,
}

/// An equality condition on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field name.
    pub field: String,
    /// Required value.
    pub value: Value,
}

impl FieldFilter {
    /// Match documents whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document satisfies this filter.
    #[must_use]
    pub fn matches(&self, fields: &Document) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// A store of JSON documents grouped into collections.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs and `carrent status`.
    fn backend(&self) -> &'static str;

    /// Fetch one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Merge `fields` into an existing document. Returns `false` if the
    /// document does not exist; nothing is created in that case.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool>;

    /// Delete a document. Returns `false` if it did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>>;

    /// Per-collection counts and file size, for stores that keep them
    /// locally. Remote stores return `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics cannot be read.
    fn storage_stats(&self) -> Result<Option<StorageStats>> {
        Ok(None)
    }

    /// Documents matching all `filters`.
    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<StoredDocument>> {
        let documents = self.list(collection).await?;
        Ok(documents
            .into_iter()
            .filter(|doc| filters.iter().all(|f| f.matches(&doc.fields)))
            .collect())
    }
}

/// Serialize a record into document fields.
///
/// # Errors
///
/// Returns an error if the value does not serialize to a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::internal(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Deserialize document fields into a record.
///
/// # Errors
///
/// Returns [`Error::MalformedDocument`] if the fields do not fit `T`.
pub fn from_document<T: DeserializeOwned>(collection: &str, id: &str, fields: Document) -> Result<T> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| Error::MalformedDocument {
        collection: collection.to_string(),
        id: id.to_string(),
        message: e.to_string(),
    })
}

/// Open the document store selected by the configuration.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the cloud
/// credentials cannot be loaded.
pub fn open_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(config.database_path())?),
        StorageBackend::Firestore => Arc::new(FirestoreStore::from_config(&config.cloud)?),
    };
    info!(backend = store.backend(), "Document store ready");
    Ok(store)
}
