//! Races between concurrent callers sharing one repository.
//!
//! `SqliteStore` never yields, so `tokio::join!` over it runs the calls one
//! after another. `YieldingStore` gives the scheduler a chance to switch
//! tasks before every store operation, the way a network backend does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

use carrental::auth::{AuthManager, NewUser};
use carrental::models::NewCar;
use carrental::rental::{book_car, BookingRequest};
use carrental::session::SessionStore;
use carrental::storage::{Document, FieldFilter, StoredDocument};
use carrental::{DocumentStore, Error, Money, Repository, Role, SqliteStore, User};

#[derive(Debug)]
struct YieldingStore {
    inner: SqliteStore,
}

#[async_trait]
impl DocumentStore for YieldingStore {
    fn backend(&self) -> &'static str {
        "yielding"
    }

    async fn get(&self, collection: &str, id: &str) -> carrental::Result<Option<Document>> {
        tokio::task::yield_now().await;
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, fields: Document) -> carrental::Result<()> {
        tokio::task::yield_now().await;
        self.inner.set(collection, id, fields).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> carrental::Result<bool> {
        tokio::task::yield_now().await;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> carrental::Result<bool> {
        tokio::task::yield_now().await;
        self.inner.delete(collection, id).await
    }

    async fn list(&self, collection: &str) -> carrental::Result<Vec<StoredDocument>> {
        tokio::task::yield_now().await;
        self.inner.list(collection).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> carrental::Result<Vec<StoredDocument>> {
        tokio::task::yield_now().await;
        self.inner.query(collection, filters).await
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn day(offset: i64) -> NaiveDate {
    today() + Duration::days(offset)
}

fn repo() -> Repository {
    let store = YieldingStore {
        inner: SqliteStore::open_in_memory().unwrap(),
    };
    Repository::new(Arc::new(store))
}

fn customer(uid: &str) -> User {
    User {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid.to_lowercase()),
        name: uid.to_string(),
        role: Role::Customer,
        phone: String::new(),
        address: String::new(),
        created_at: chrono::Utc::now(),
    }
}

async fn add_car(repo: &Repository) -> String {
    repo.add_car(
        NewCar {
            brand: "Tata".to_string(),
            model: "Nexon".to_string(),
            year: 2024,
            daily_rate: Money::from_rupees(2200),
            color: "Blue".to_string(),
            fuel_type: "Electric".to_string(),
            seats: 5,
            image_url: String::new(),
        },
        today(),
    )
    .await
    .unwrap()
    .car_id
}

#[tokio::test]
async fn test_booked_car_refused_for_later_dates_under_race() {
    let repo = repo();
    let car_id = add_car(&repo).await;
    let first = BookingRequest {
        car_id: car_id.clone(),
        start_date: day(1),
        end_date: day(3),
    };
    let later = BookingRequest {
        car_id: car_id.clone(),
        start_date: day(10),
        end_date: day(12),
    };

    let user_a = customer("USER_A");
    let user_b = customer("USER_B");
    let (a, b) = tokio::join!(
        book_car(&repo, &user_a, &first, today()),
        book_car(&repo, &user_b, &later, today()),
    );

    assert_eq!(
        usize::from(a.is_ok()) + usize::from(b.is_ok()),
        1,
        "exactly one booking wins: {a:?} / {b:?}"
    );
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(Error::CarUnavailable { .. })));

    let active = repo
        .list_bookings()
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.car_id == car_id && b.is_active())
        .count();
    assert_eq!(active, 1);
    assert_eq!(repo.list_payments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_car_racing_a_booking() {
    let repo = repo();
    let car_id = add_car(&repo).await;
    let request = BookingRequest {
        car_id: car_id.clone(),
        start_date: day(1),
        end_date: day(4),
    };

    let user_a = customer("USER_A");
    let (deleted, booked) = tokio::join!(
        repo.delete_car(&car_id),
        book_car(&repo, &user_a, &request, today()),
    );

    match (deleted, booked) {
        (Ok(()), Err(e)) => assert!(e.is_not_found() || matches!(e, Error::CarUnavailable { .. })),
        (Err(Error::CarInUse { .. }), Ok(receipt)) => {
            assert_eq!(receipt.booking.car_id, car_id);
        }
        other => panic!("delete and booking both went through or both failed: {other:?}"),
    }

    // No active booking may point at a car that is gone.
    let car_exists = repo.get_car(&car_id).await.unwrap().is_some();
    for booking in repo.list_bookings().await.unwrap() {
        assert!(!booking.is_active() || car_exists, "orphaned booking {booking:?}");
    }
}

#[tokio::test]
async fn test_concurrent_registration_with_one_email() {
    let dir = TempDir::new().unwrap();
    let repo = repo();
    let sessions = SessionStore::new(dir.path().join("session.json"), Duration::hours(12));
    let auth = AuthManager::new(repo.clone(), sessions);
    let new_user = || NewUser {
        email: "twin@example.com".to_string(),
        password: "rent4fun".to_string(),
        name: "Twin".to_string(),
        role: Role::Customer,
        phone: String::new(),
        address: String::new(),
    };

    let (a, b) = tokio::join!(auth.register(new_user()), auth.register(new_user()));

    assert_eq!(
        usize::from(a.is_ok()) + usize::from(b.is_ok()),
        1,
        "exactly one registration wins: {a:?} / {b:?}"
    );
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(Error::EmailTaken { .. })));

    let twins = repo
        .list_customers()
        .await
        .unwrap()
        .into_iter()
        .filter(|u| u.email == "twin@example.com")
        .count();
    assert_eq!(twins, 1);
}
