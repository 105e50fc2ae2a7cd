//! Local document store backed by `SQLite`.
//!
//! Documents are kept as JSON text in a single `documents` table. Equality
//! queries on scalar fields are answered with `json_extract` so only
//! matching rows leave the database.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use super::{migrations, Document, DocumentStore, FieldFilter, StoredDocument};
use crate::error::{Error, Result};

/// Document store in a local `SQLite` file.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets `carrent watch` read while another process writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Document counts per collection and the size of the database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT collection, COUNT(*) FROM documents GROUP BY collection")?;
        let collections = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            collections,
            db_size_bytes,
        })
    }

    fn parse_body(collection: &str, id: &str, body: &str) -> Result<Document> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(Error::MalformedDocument {
                collection: collection.to_string(),
                id: id.to_string(),
                message: "stored body is not a JSON object".to_string(),
            }),
            Err(e) => Err(Error::MalformedDocument {
                collection: collection.to_string(),
                id: id.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn write(conn: &Connection, collection: &str, id: &str, fields: &Document) -> Result<()> {
        let body = serde_json::to_string(fields)?;
        conn.execute(
            r"
            INSERT INTO documents (collection, id, body, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
            params![collection, id, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn query_rows(
        conn: &Connection,
        collection: &str,
        sql: &str,
        args: Vec<SqlValue>,
    ) -> Result<Vec<StoredDocument>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, body)| {
                let fields = Self::parse_body(collection, &id, &body)?;
                Ok(StoredDocument { id, fields })
            })
            .collect()
    }
}

/// Whether a field name can be embedded in a JSON path.
fn is_plain_field(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// The SQL value `json_extract` yields for a scalar JSON value.
fn sql_scalar(value: &Value) -> Option<SqlValue> {
    match value {
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn storage_stats(&self) -> Result<Option<StorageStats>> {
        self.stats().map(Some)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| Self::parse_body(collection, id, &body))
            .transpose()
    }

    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let conn = self.conn()?;
        Self::write(&conn, collection, id, &fields)?;
        debug!(collection, id, "Stored document");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Ok(false);
        };

        let mut merged = Self::parse_body(collection, id, &body)?;
        merged.extend(fields);
        Self::write(&tx, collection, id, &merged)?;
        tx.commit()?;

        debug!(collection, id, "Updated document");
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(affected > 0)
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let conn = self.conn()?;
        Self::query_rows(
            &conn,
            collection,
            "SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id",
            vec![SqlValue::Text(collection.to_string())],
        )
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<StoredDocument>> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?1");
        let mut args = vec![SqlValue::Text(collection.to_string())];
        let mut residual = Vec::new();

        for filter in filters {
            match sql_scalar(&filter.value) {
                Some(value) if is_plain_field(&filter.field) => {
                    args.push(value);
                    sql.push_str(&format!(
                        " AND json_extract(body, '$.{}') = ?{}",
                        filter.field,
                        args.len()
                    ));
                }
                _ => residual.push(filter),
            }
        }
        sql.push_str(" ORDER BY id");

        let conn = self.conn()?;
        let documents = Self::query_rows(&conn, collection, &sql, args)?;
        Ok(documents
            .into_iter()
            .filter(|doc| residual.iter().all(|f| f.matches(&doc.fields)))
            .collect())
    }
}

/// Statistics about the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of documents per collection.
    pub collections: BTreeMap<String, i64>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
