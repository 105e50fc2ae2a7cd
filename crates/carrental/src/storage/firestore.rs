//! Cloud document store backed by the Firestore REST API.
//!
//! Authentication uses a Google service-account key: a signed JWT is
//! exchanged for an OAuth access token, which is cached until shortly
//! before it expires. When an emulator host is configured no token is
//! requested.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::codec::{decode_fields, encode_fields, encode_value};
use super::{Document, DocumentStore, FieldFilter, StoredDocument};
use crate::config::{CloudConfig, CREDENTIALS_ENV};
use crate::error::{Error, Result};

/// Public Firestore endpoint.
const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";

/// Default OAuth token endpoint for service accounts.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth scope granting Firestore access.
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Grant type for the JWT bearer token exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for signed assertions.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Documents fetched per list page.
const PAGE_SIZE: &str = "300";

/// The parts of a service-account key file we use.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account identity.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// OAuth token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Project the key belongs to.
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Load a key from a JSON key file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not a service-account key.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::CredentialsFileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| Error::ConfigValidation {
            message: format!("invalid service account file {}: {e}", path.display()),
        })
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Exchanges signed assertions for access tokens and caches the result.
struct TokenSource {
    key: ServiceAccountKey,
    cached: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSource")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            cached: Mutex::new(None),
        }
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &key,
        )?)
    }

    async fn access_token(&self, client: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        debug!(client_email = %self.key.client_email, "Requesting access token");
        let assertion = self.assertion(now)?;
        let response = client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let body: TokenResponse = check(response).await?.json().await?;

        let token = AccessToken {
            value: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

#[derive(Debug)]
enum Auth {
    /// Emulators accept any bearer token.
    Emulator,
    ServiceAccount(TokenSource),
}

#[derive(Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

/// Document store in Google Cloud Firestore.
#[derive(Debug)]
pub struct FirestoreStore {
    client: reqwest::Client,
    /// `.../projects/{project}/databases/(default)/documents`
    documents_url: String,
    auth: Auth,
}

fn documents_path(project_id: &str) -> String {
    format!("projects/{project_id}/databases/(default)/documents")
}

/// Turn a non-success response into [`Error::Cloud`], preferring the
/// message from Google's error envelope.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    warn!(status = status.as_u16(), %message, "Firestore request failed");
    Err(Error::Cloud {
        status: status.as_u16(),
        message,
    })
}

impl FirestoreStore {
    /// Connect using the `[cloud]` configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required settings are missing or the
    /// service-account key cannot be loaded.
    pub fn from_config(cloud: &CloudConfig) -> Result<Self> {
        cloud.require_firestore()?;
        let project_id = cloud.project_id.clone().unwrap_or_default();
        let client = reqwest::Client::builder()
            .timeout(cloud.request_timeout())
            .build()?;

        if let Some(host) = &cloud.emulator_host {
            info!(%host, project = %project_id, "Using Firestore emulator");
            let url = format!("http://{host}/v1/{}", documents_path(&project_id));
            return Ok(Self::with_auth(client, url, Auth::Emulator));
        }

        let path = cloud
            .credentials_path
            .as_deref()
            .ok_or(Error::MissingCloudSettings {
                keys: vec![CREDENTIALS_ENV],
            })?;
        let key = ServiceAccountKey::from_file(path)?;
        info!(project = %project_id, client_email = %key.client_email, "Connecting to Firestore");

        let url = format!("{FIRESTORE_API}/{}", documents_path(&project_id));
        Ok(Self::with_auth(
            client,
            url,
            Auth::ServiceAccount(TokenSource::new(key)),
        ))
    }

    /// Connect without authentication to a documents root URL, as served by
    /// the Firestore emulator.
    #[must_use]
    pub fn emulator(documents_url: impl Into<String>) -> Self {
        Self::with_auth(reqwest::Client::new(), documents_url.into(), Auth::Emulator)
    }

    fn with_auth(client: reqwest::Client, documents_url: String, auth: Auth) -> Self {
        Self {
            client,
            documents_url: documents_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.documents_url)
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let builder = self.client.request(method, url);
        Ok(match &self.auth {
            Auth::Emulator => builder.bearer_auth("owner"),
            Auth::ServiceAccount(source) => builder.bearer_auth(source.access_token(&self.client).await?),
        })
    }

    fn into_stored(collection: &str, document: FirestoreDocument) -> Result<StoredDocument> {
        let id = document
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let fields = decode_fields(document.fields.as_ref()).map_err(|message| {
            Error::MalformedDocument {
                collection: collection.to_string(),
                id: id.clone(),
                message,
            }
        })?;
        Ok(StoredDocument { id, fields })
    }

    fn structured_query(collection: &str, filters: &[FieldFilter]) -> Value {
        let mut conditions: Vec<Value> = filters
            .iter()
            .map(|f| {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": f.field },
                        "op": "EQUAL",
                        "value": encode_value(&f.value),
                    }
                })
            })
            .collect();

        let mut query = json!({ "from": [{ "collectionId": collection }] });
        if conditions.len() == 1 {
            query["where"] = conditions.remove(0);
        } else if !conditions.is_empty() {
            query["where"] = json!({
                "compositeFilter": { "op": "AND", "filters": conditions }
            });
        }
        json!({ "structuredQuery": query })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn backend(&self) -> &'static str {
        "firestore"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let url = self.document_url(collection, id);
        let response = self.request(Method::GET, &url).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document: FirestoreDocument = check(response).await?.json().await?;
        Ok(Some(Self::into_stored(collection, document)?.fields))
    }

    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let url = self.document_url(collection, id);
        let response = self
            .request(Method::PATCH, &url)
            .await?
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;
        check(response).await?;
        debug!(collection, id, "Stored document");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<bool> {
        let url = self.document_url(collection, id);
        let mut params: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let response = self
            .request(Method::PATCH, &url)
            .await?
            .query(&params)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        debug!(collection, id, "Updated document");
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let url = self.document_url(collection, id);
        let response = self
            .request(Method::DELETE, &url)
            .await?
            .query(&[("currentDocument.exists", "true")])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>> {
        let url = format!("{}/{collection}", self.documents_url);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let response = self
                .request(Method::GET, &url)
                .await?
                .query(&params)
                .send()
                .await?;
            let page: ListResponse = check(response).await?.json().await?;
            for document in page.documents {
                documents.push(Self::into_stored(collection, document)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn query(&self, collection: &str, filters: &[FieldFilter]) -> Result<Vec<StoredDocument>> {
        if filters.is_empty() {
            return self.list(collection).await;
        }

        let url = format!("{}:runQuery", self.documents_url);
        let response = self
            .request(Method::POST, &url)
            .await?
            .json(&Self::structured_query(collection, filters))
            .send()
            .await?;
        let items: Vec<RunQueryItem> = check(response).await?.json().await?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|document| Self::into_stored(collection, document))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use httpmock::Method::PATCH;
    use std::path::PathBuf;

    const ROOT: &str = "/v1/projects/demo/databases/(default)/documents";
    const FIXTURE_KEY: &str = include_str!("../../tests/fixtures/service_account.json");

    fn store(server: &MockServer) -> FirestoreStore {
        FirestoreStore::emulator(server.url(ROOT))
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_get_decodes_fields() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{ROOT}/cars/CAR_1"));
                then.status(200).json_body(json!({
                    "name": "projects/demo/databases/(default)/documents/cars/CAR_1",
                    "fields": {
                        "brand": {"stringValue": "Kia"},
                        "seats": {"integerValue": "5"}
                    }
                }));
            })
            .await;

        let fields = store(&server).get("cars", "CAR_1").await.unwrap().unwrap();
        mock.assert_async().await;
        assert_eq!(fields["brand"], json!("Kia"));
        assert_eq!(fields["seats"], json!(5));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{ROOT}/cars/NOPE"));
                then.status(404)
                    .json_body(json!({"error": {"code": 404, "message": "not found"}}));
            })
            .await;

        assert!(store(&server).get("cars", "NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_patches_whole_document() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path(format!("{ROOT}/users/USER_1"))
                    .header("authorization", "Bearer owner")
                    .json_body(json!({"fields": {"name": {"stringValue": "Asha"}}}));
                then.status(200).json_body(json!({
                    "name": "projects/demo/databases/(default)/documents/users/USER_1"
                }));
            })
            .await;

        store(&server)
            .set("users", "USER_1", doc(json!({"name": "Asha"})))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_sends_mask_and_precondition() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path(format!("{ROOT}/cars/CAR_1"))
                    .query_param("updateMask.fieldPaths", "status")
                    .query_param("currentDocument.exists", "true");
                then.status(200).json_body(json!({
                    "name": "projects/demo/databases/(default)/documents/cars/CAR_1"
                }));
            })
            .await;

        let updated = store(&server)
            .update("cars", "CAR_1", doc(json!({"status": "Booked"})))
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(updated);
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PATCH).path(format!("{ROOT}/cars/GONE"));
                then.status(404);
            })
            .await;

        let updated = store(&server)
            .update("cars", "GONE", doc(json!({"status": "Booked"})))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{ROOT}/cars/CAR_1"));
                then.status(200).json_body(json!({}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{ROOT}/cars/CAR_2"));
                then.status(404);
            })
            .await;

        let store = store(&server);
        assert!(store.delete("cars", "CAR_1").await.unwrap());
        assert!(!store.delete("cars", "CAR_2").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_requests_pages() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("{ROOT}/cars"))
                    .query_param("pageSize", PAGE_SIZE);
                then.status(200).json_body(json!({
                    "documents": [
                        {
                            "name": "projects/demo/databases/(default)/documents/cars/CAR_1",
                            "fields": {"brand": {"stringValue": "Kia"}}
                        },
                        {
                            "name": "projects/demo/databases/(default)/documents/cars/CAR_2",
                            "fields": {"brand": {"stringValue": "Honda"}}
                        }
                    ],
                    "nextPageToken": ""
                }));
            })
            .await;

        let docs = store(&server).list("cars").await.unwrap();
        mock.assert_async().await;

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["CAR_1", "CAR_2"]);
        assert_eq!(docs[1].fields["brand"], json!("Honda"));
    }

    #[tokio::test]
    async fn test_list_empty_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{ROOT}/payments"));
                then.status(200).json_body(json!({}));
            })
            .await;

        assert!(store(&server).list("payments").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_runs_structured_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("{ROOT}:runQuery"))
                    .json_body(json!({
                        "structuredQuery": {
                            "from": [{"collectionId": "users"}],
                            "where": {"fieldFilter": {
                                "field": {"fieldPath": "email"},
                                "op": "EQUAL",
                                "value": {"stringValue": "asha@example.com"}
                            }}
                        }
                    }));
                then.status(200).json_body(json!([
                    {
                        "document": {
                            "name": "projects/demo/databases/(default)/documents/users/USER_1",
                            "fields": {"email": {"stringValue": "asha@example.com"}}
                        },
                        "readTime": "2026-10-18T10:00:00Z"
                    }
                ]));
            })
            .await;

        let found = store(&server)
            .query("users", &[FieldFilter::eq("email", "asha@example.com")])
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "USER_1");
    }

    #[tokio::test]
    async fn test_query_without_results() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(format!("{ROOT}:runQuery"));
                then.status(200)
                    .json_body(json!([{"readTime": "2026-10-18T10:00:00Z"}]));
            })
            .await;

        let found = store(&server)
            .query("users", &[FieldFilter::eq("email", "x@y.com")])
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_maps_to_cloud_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{ROOT}/cars/CAR_1"));
                then.status(403).json_body(json!({
                    "error": {"code": 403, "message": "Missing or insufficient permissions."}
                }));
            })
            .await;

        let err = store(&server).get("cars", "CAR_1").await.unwrap_err();
        match err {
            Error::Cloud { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Missing or insufficient permissions.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_structured_query_composite() {
        let query = FirestoreStore::structured_query(
            "bookings",
            &[
                FieldFilter::eq("car_id", "CAR_1"),
                FieldFilter::eq("status", "Active"),
            ],
        );
        let filters = &query["structuredQuery"]["where"]["compositeFilter"]["filters"];
        assert_eq!(filters.as_array().unwrap().len(), 2);
        assert_eq!(query["structuredQuery"]["where"]["compositeFilter"]["op"], "AND");
    }

    #[tokio::test]
    async fn test_service_account_token_is_cached() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
                    .body_contains("assertion=");
                then.status(200)
                    .json_body(json!({"access_token": "ya29.test", "expires_in": 3600, "token_type": "Bearer"}));
            })
            .await;
        let doc_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(format!("{ROOT}/cars/CAR_1"))
                    .header("authorization", "Bearer ya29.test");
                then.status(404);
            })
            .await;

        let mut key: ServiceAccountKey = serde_json::from_str(FIXTURE_KEY).unwrap();
        key.token_uri = server.url("/token");
        let store = FirestoreStore::with_auth(
            reqwest::Client::new(),
            server.url(ROOT),
            Auth::ServiceAccount(TokenSource::new(key)),
        );

        assert!(store.get("cars", "CAR_1").await.unwrap().is_none());
        assert!(store.get("cars", "CAR_1").await.unwrap().is_none());
        token_mock.assert_hits_async(1).await;
        doc_mock.assert_hits_async(2).await;
    }

    #[test]
    fn test_assertion_is_signed_jwt() {
        let key: ServiceAccountKey = serde_json::from_str(FIXTURE_KEY).unwrap();
        let jwt = TokenSource::new(key).assertion(Utc::now()).unwrap();
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn test_access_token_freshness() {
        let now = Utc::now();
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(30),
        };
        assert!(!token.is_fresh(now));
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(600),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn test_service_account_key_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sa.json");
        std::fs::write(&path, FIXTURE_KEY).unwrap();

        let key = ServiceAccountKey::from_file(&path).unwrap();
        assert_eq!(key.client_email, "carrental@rental-demo.iam.gserviceaccount.com");
        assert_eq!(key.project_id.as_deref(), Some("rental-demo"));
        assert!(!format!("{key:?}").contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_service_account_key_errors() {
        let missing = ServiceAccountKey::from_file(&PathBuf::from("/nonexistent/sa.json"));
        assert!(matches!(missing, Err(Error::CredentialsFileNotFound { .. })));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"type\": \"authorized_user\"}").unwrap();
        assert!(ServiceAccountKey::from_file(&path).is_err());
    }

    #[test]
    fn test_from_config_emulator() {
        let cloud = CloudConfig {
            project_id: Some("demo".to_string()),
            emulator_host: Some("localhost:8080".to_string()),
            ..CloudConfig::default()
        };
        let store = FirestoreStore::from_config(&cloud).unwrap();
        assert_eq!(
            store.documents_url,
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents"
        );
        assert_eq!(store.backend(), "firestore");
    }

    #[test]
    fn test_from_config_requires_settings() {
        let err = FirestoreStore::from_config(&CloudConfig::default()).unwrap_err();
        assert!(matches!(err, Error::MissingCloudSettings { .. }));
    }
}
