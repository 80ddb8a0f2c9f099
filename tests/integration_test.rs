//! Integration tests for crud-kit
//!
//! These tests drive the generic dispatcher end to end over the in-memory
//! store and cache, checking how reads, writes and invalidations interact.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crud_kit::backend::{CacheBackend, InMemoryBackend};
use crud_kit::models::{Product, User};
use crud_kit::repository::{InMemoryStore, Scope, Store};
use crud_kit::{CacheGateway, Dispatcher, Error, Patch, Record, UpdateMode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    dispatcher: Dispatcher<Product>,
    store: Arc<InMemoryStore<Product>>,
    backend: InMemoryBackend,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::<Product>::new());
    let backend = InMemoryBackend::new();
    let gateway = CacheGateway::new(Arc::new(backend.clone()));
    Fixture {
        dispatcher: Dispatcher::new(store.clone(), gateway),
        store,
        backend,
    }
}

fn lamp() -> Value {
    json!({"name": "Lamp", "description": "desk lamp", "price": 24.5, "stock": 8})
}

/// Test 1: Create then Get
///
/// - Create persists and does not write the cache
/// - A cold Get returns exactly what Create returned
/// - The Get populates `products:<id>`
#[tokio::test]
async fn test_create_then_get_cold_cache() {
    let f = fixture();

    let created = f.dispatcher.create(lamp()).await.expect("create");
    assert!(
        f.backend.is_empty(),
        "create must not populate the cache"
    );

    let fetched = f
        .dispatcher
        .get(&created.id.to_string())
        .await
        .expect("get");

    assert_eq!(fetched, created);
    assert!(f
        .backend
        .exists(&format!("products:{}", created.id))
        .await
        .unwrap());
}

/// Test 2: Cache hit skips the store
#[tokio::test]
async fn test_cached_get_does_not_touch_store() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();

    f.dispatcher.get("1").await.expect("cold get");
    let calls_after_miss = f.store.calls();

    for _ in 0..5 {
        f.dispatcher.get("1").await.expect("warm get");
    }

    assert_eq!(f.store.calls(), calls_after_miss);
}

/// Test 3: Update then Get never serves the old value
///
/// Both update modes, with the entry warm before each write.
#[tokio::test]
async fn test_update_invalidates_cached_value() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();

    f.dispatcher.get("1").await.unwrap();
    f.dispatcher
        .update("1", json!({"price": 30.0}), UpdateMode::Partial)
        .await
        .expect("patch");
    assert!(!f.backend.exists("products:1").await.unwrap());
    assert_eq!(f.dispatcher.get("1").await.unwrap().price, 30.0);

    f.dispatcher.get("1").await.unwrap();
    f.dispatcher
        .update(
            "1",
            json!({"name": "Floor Lamp", "price": 80.0, "stock": 2}),
            UpdateMode::Full,
        )
        .await
        .expect("put");
    let fetched = f.dispatcher.get("1").await.unwrap();
    assert_eq!(fetched.name, "Floor Lamp");
    assert_eq!(fetched.description, "");
}

/// Test 4: Update bumps `updated_at` and leaves `created_at` alone
#[tokio::test]
async fn test_update_bumps_updated_at() {
    let f = fixture();
    let created = f.dispatcher.create(lamp()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = f
        .dispatcher
        .update("1", json!({"stock": 1}), UpdateMode::Partial)
        .await
        .unwrap();

    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

/// Test 5: Delete then Get is NotFound, even with a warm cache
#[tokio::test]
async fn test_delete_then_get_not_found() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();
    f.dispatcher.get("1").await.unwrap();

    f.dispatcher.delete("1").await.expect("delete");

    assert!(!f.backend.exists("products:1").await.unwrap());
    let err = f.dispatcher.get("1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.to_string(), "products 1 not found");

    // Still stored, only hidden.
    assert!(f.store.find_by_id(&1, Scope::All).await.unwrap().is_some());
}

/// Test 6: List filtering and Restore
///
/// - List(false) hides soft-deleted rows, List(true) shows them
/// - Restore brings the row back into List(false)
/// - Results are in ascending id order
#[tokio::test]
async fn test_list_and_restore() {
    let f = fixture();
    for _ in 0..3 {
        f.dispatcher.create(lamp()).await.unwrap();
    }

    f.dispatcher.delete("2").await.unwrap();

    let ids = |rows: Vec<Product>| rows.iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(ids(f.dispatcher.list(false).await.unwrap()), vec![1, 3]);
    assert_eq!(ids(f.dispatcher.list(true).await.unwrap()), vec![1, 2, 3]);

    f.dispatcher.restore("2").await.expect("restore");
    assert_eq!(ids(f.dispatcher.list(false).await.unwrap()), vec![1, 2, 3]);
    assert!(f.dispatcher.get("2").await.is_ok());
}

/// Test 7: Restore invalidates like Delete
#[tokio::test]
async fn test_restore_invalidates() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();
    f.dispatcher.get("1").await.unwrap();

    f.dispatcher.restore("1").await.unwrap();

    assert!(!f.backend.exists("products:1").await.unwrap());
}

/// Test 8: Unknown ids
#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let f = fixture();

    assert!(matches!(f.dispatcher.get("7").await, Err(Error::NotFound(_))));
    assert!(matches!(
        f.dispatcher
            .update("7", json!({"stock": 1}), UpdateMode::Partial)
            .await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(f.dispatcher.delete("7").await, Err(Error::NotFound(_))));
    assert!(matches!(f.dispatcher.restore("7").await, Err(Error::NotFound(_))));
    assert!(f.backend.is_empty());
}

/// Test 9: Malformed payloads
#[tokio::test]
async fn test_invalid_payloads() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();

    assert!(matches!(
        f.dispatcher.create(json!({"price": "free"})).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        f.dispatcher
            .update("1", json!("price=3"), UpdateMode::Partial)
            .await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        f.dispatcher
            .update("1", json!({"created_at": "2020-01-01T00:00:00Z"}), UpdateMode::Partial)
            .await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        f.dispatcher
            .update("1", json!({"stock": 3}), UpdateMode::Full)
            .await,
        Err(Error::InvalidInput(_))
    ));
}

/// Test 10: Last writer wins
///
/// Load and write are separate statements with no version check; two
/// updates of the same row from different tasks both succeed and the later
/// one is what remains.
#[tokio::test]
async fn test_concurrent_updates_last_writer_wins() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();

    let first = f.dispatcher.clone();
    let second = f.dispatcher.clone();
    let a = tokio::spawn(async move {
        first
            .update("1", json!({"stock": 100}), UpdateMode::Partial)
            .await
    });
    let a = a.await.expect("task").expect("first update");

    let b = tokio::spawn(async move {
        second
            .update("1", json!({"stock": 200}), UpdateMode::Partial)
            .await
    });
    let b = b.await.expect("task").expect("second update");

    assert_eq!((a.stock, b.stock), (100, 200));
    assert_eq!(f.dispatcher.get("1").await.unwrap().stock, 200);
}

/// Test 11: Stale read window
///
/// A row written behind the dispatcher's back stays stale until the TTL or
/// an invalidation; the cache is the only thing read on a hit.
#[tokio::test]
async fn test_out_of_band_write_is_stale_until_invalidated() {
    let f = fixture();
    f.dispatcher.create(lamp()).await.unwrap();
    f.dispatcher.get("1").await.unwrap();

    let patch: Patch = serde_json::from_value(json!({"stock": 0})).unwrap();
    f.store.update_fields(&1, &patch).await.unwrap();
    assert_eq!(f.dispatcher.get("1").await.unwrap().stock, 8);

    f.dispatcher.cache().invalidate("products:1").await;
    assert_eq!(f.dispatcher.get("1").await.unwrap().stock, 0);
}

/// Test 12: Cache outage degrades to the store
#[tokio::test]
async fn test_cache_outage_is_not_fatal() {
    struct Down;

    #[async_trait]
    impl CacheBackend for Down {
        async fn get(&self, _key: &str) -> crud_kit::Result<Option<Vec<u8>>> {
            Err(Error::BackendError("down".into()))
        }
        async fn set(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: Option<Duration>,
        ) -> crud_kit::Result<()> {
            Err(Error::BackendError("down".into()))
        }
        async fn delete(&self, _key: &str) -> crud_kit::Result<()> {
            Err(Error::BackendError("down".into()))
        }
    }

    let store = Arc::new(InMemoryStore::<Product>::new());
    let dispatcher = Dispatcher::new(store.clone(), CacheGateway::new(Arc::new(Down)));

    let created = dispatcher.create(lamp()).await.unwrap();
    assert_eq!(dispatcher.get("1").await.unwrap(), created);
    dispatcher
        .update("1", json!({"stock": 2}), UpdateMode::Partial)
        .await
        .unwrap();
    dispatcher.delete("1").await.unwrap();
    assert!(matches!(dispatcher.get("1").await, Err(Error::NotFound(_))));
}

/// Test 13: Slow store surfaces as a timeout
#[tokio::test]
async fn test_slow_store_times_out() {
    struct Stuck;

    #[async_trait]
    impl Store<Product> for Stuck {
        async fn create(&self, _draft: &<Product as Record>::Draft) -> crud_kit::Result<Product> {
            std::future::pending().await
        }
        async fn find_by_id(&self, _id: &i64, _scope: Scope) -> crud_kit::Result<Option<Product>> {
            std::future::pending().await
        }
        async fn find_all(&self, _scope: Scope) -> crud_kit::Result<Vec<Product>> {
            std::future::pending().await
        }
        async fn update(
            &self,
            _id: &i64,
            _draft: &<Product as Record>::Draft,
        ) -> crud_kit::Result<Option<Product>> {
            std::future::pending().await
        }
        async fn update_fields(
            &self,
            _id: &i64,
            _patch: &Patch,
        ) -> crud_kit::Result<Option<Product>> {
            std::future::pending().await
        }
        async fn set_deleted_at(
            &self,
            _id: &i64,
            _at: Option<DateTime<Utc>>,
        ) -> crud_kit::Result<u64> {
            std::future::pending().await
        }
    }

    let dispatcher = Dispatcher::new(
        Arc::new(Stuck),
        CacheGateway::new(Arc::new(InMemoryBackend::new())),
    )
    .with_timeout(Duration::from_millis(20));

    assert!(matches!(dispatcher.get("1").await, Err(Error::Timeout(_))));
    assert!(matches!(dispatcher.list(false).await, Err(Error::Timeout(_))));
    assert!(matches!(dispatcher.delete("1").await, Err(Error::Timeout(_))));
}

/// Test 14: Users share the same machinery
///
/// The cached copy of a user never carries the password hash.
#[tokio::test]
async fn test_user_cache_entry_has_no_password() {
    let store = Arc::new(InMemoryStore::<User>::new());
    let backend = InMemoryBackend::new();
    let dispatcher = Dispatcher::new(store, CacheGateway::new(Arc::new(backend.clone())));

    dispatcher
        .create(json!({"username": "carol", "password": "pw", "email": "c@example.com"}))
        .await
        .unwrap();
    dispatcher.get("1").await.unwrap();

    let bytes = backend.get("users:1").await.unwrap().expect("cached");
    let payload = String::from_utf8_lossy(&bytes[8..]).to_string();
    assert!(payload.contains("carol"));
    assert!(!payload.contains("password"));
    assert!(!payload.contains("argon2"));
}
