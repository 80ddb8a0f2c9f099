//! In-memory store for tests and local runs.

use super::{Scope, Store, UserDirectory};
use crate::entity::{Patch, Record};
use crate::error::Result;
use crate::models::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Store backed by an ordered map, with store-assigned ids starting at 1.
///
/// Every trait call bumps a counter, so tests can assert that a cache hit
/// never reached the store.
///
/// Uniqueness constraints are not enforced.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemoryStore::<Product>::new());
/// let dispatcher = Dispatcher::new(store.clone(), gateway);
///
/// dispatcher.get("1").await?;
/// dispatcher.get("1").await?;
/// assert_eq!(store.calls(), 1);
/// ```
pub struct InMemoryStore<T: Record<Id = i64>> {
    rows: RwLock<BTreeMap<i64, T>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
}

impl<T: Record<Id = i64>> InMemoryStore<T> {
    /// Create a new empty store.
    pub fn new() -> Self {
        InMemoryStore {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `Store` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored rows, soft-deleted ones included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Remove all rows and reset the id sequence.
    pub async fn clear(&self) {
        self.rows.write().await.clear();
        self.next_id.store(1, Ordering::SeqCst);
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl<T: Record<Id = i64>> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record<Id = i64>> Store<T> for InMemoryStore<T> {
    async fn create(&self, draft: &T::Draft) -> Result<T> {
        self.touch();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = T::from_draft(id, draft.clone(), Utc::now());
        self.rows.write().await.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: &i64, scope: Scope) -> Result<Option<T>> {
        self.touch();
        let rows = self.rows.read().await;
        Ok(rows.get(id).filter(|row| scope.admits(*row)).cloned())
    }

    async fn find_all(&self, scope: Scope) -> Result<Vec<T>> {
        self.touch();
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|row| scope.admits(*row)).cloned().collect())
    }

    async fn update(&self, id: &i64, draft: &T::Draft) -> Result<Option<T>> {
        self.touch();
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(id).map(|row| {
            row.apply_draft(draft.clone());
            row.set_updated_at(Utc::now());
            row.clone()
        }))
    }

    async fn update_fields(&self, id: &i64, patch: &Patch) -> Result<Option<T>> {
        self.touch();
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(id) else {
            return Ok(None);
        };
        row.apply_patch(patch)?;
        row.set_updated_at(Utc::now());
        Ok(Some(row.clone()))
    }

    async fn set_deleted_at(&self, id: &i64, at: Option<DateTime<Utc>>) -> Result<u64> {
        self.touch();
        let mut rows = self.rows.write().await;
        match rows.get_mut(id) {
            Some(row) => {
                row.set_deleted_at(at);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore<User> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.touch();
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .find(|user| user.is_live() && user.username == username)
            .cloned())
    }
}
