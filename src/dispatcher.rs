//! Generic CRUD dispatcher.
//!
//! One [`Dispatcher`] per record type composes a [`Store`] with the
//! [`CacheGateway`]:
//!
//! - **get**: cache first; a miss reads live rows from the store and
//!   populates the cache
//! - **create**: store only, nothing is cached until the first read
//! - **update / delete / restore**: store first, then invalidate the key
//!
//! Update reads and writes in two statements with nothing in between
//! guarding the row. Two concurrent updates of the same id both succeed and
//! the later write wins.

use crate::entity::{check_columns, Patch, Record};
use crate::error::{Error, Result};
use crate::gateway::CacheGateway;
use crate::key::CacheKeyBuilder;
use crate::repository::{Scope, Store};
use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Full replacement (`PUT`) or sparse update (`PATCH`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    Full,
    Partial,
}

/// CRUD operations for record type `T`.
pub struct Dispatcher<T: Record> {
    store: Arc<dyn Store<T>>,
    cache: CacheGateway,
    timeout: Duration,
}

impl<T: Record> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Dispatcher {
            store: self.store.clone(),
            cache: self.cache.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T: Record> Dispatcher<T> {
    pub fn new(store: Arc<dyn Store<T>>, cache: CacheGateway) -> Self {
        Dispatcher {
            store,
            cache,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound for a single store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.cache
    }

    /// Decode `payload` as a draft and persist it.
    pub async fn create(&self, payload: Value) -> Result<T> {
        let draft: T::Draft = serde_json::from_value(payload)
            .map_err(|e| Error::InvalidInput(format!("invalid payload: {}", e)))?;
        self.create_draft(draft).await
    }

    /// Validate and persist an already-decoded draft.
    pub async fn create_draft(&self, mut draft: T::Draft) -> Result<T> {
        T::prepare_draft(&mut draft)?;
        let created = self.bounded(self.store.create(&draft)).await?;
        info!("Created {} {}", T::table_name(), created.id());
        Ok(created)
    }

    /// Fetch a live row, cache first.
    pub async fn get(&self, raw_id: &str) -> Result<T> {
        let id = T::parse_id(raw_id)?;
        let key = CacheKeyBuilder::build::<T>(&id);

        if let Some(cached) = self.cache.fetch::<T>(&key).await {
            return Ok(cached);
        }

        let row = self
            .bounded(self.store.find_by_id(&id, Scope::Live))
            .await?
            .ok_or_else(|| Error::not_found(T::table_name(), id))?;

        self.cache.populate(&key, &row).await;
        Ok(row)
    }

    /// Every row in ascending id order. Never cached.
    pub async fn list(&self, include_deleted: bool) -> Result<Vec<T>> {
        self.bounded(self.store.find_all(Scope::including_deleted(include_deleted)))
            .await
    }

    /// Update a row, soft-deleted or not, and invalidate its cache entry.
    pub async fn update(&self, raw_id: &str, payload: Value, mode: UpdateMode) -> Result<T> {
        let id = T::parse_id(raw_id)?;

        let current = self
            .bounded(self.store.find_by_id(&id, Scope::All))
            .await?
            .ok_or_else(|| Error::not_found(T::table_name(), id))?;

        let written = match mode {
            UpdateMode::Full => {
                let mut draft: T::Draft = serde_json::from_value(payload)
                    .map_err(|e| Error::InvalidInput(format!("invalid payload: {}", e)))?;
                T::prepare_draft(&mut draft)?;
                self.bounded(self.store.update(&id, &draft)).await?
            }
            UpdateMode::Partial => {
                let mut patch = into_patch(payload)?;
                check_columns::<T>(&patch)?;
                T::prepare_patch(&mut patch)?;
                // Type-check against the loaded row before anything is written.
                current.clone().apply_patch(&patch)?;
                self.bounded(self.store.update_fields(&id, &patch)).await?
            }
        };

        let updated = written.ok_or_else(|| Error::not_found(T::table_name(), id))?;
        self.cache
            .invalidate(&CacheKeyBuilder::build::<T>(&id))
            .await;

        info!("Updated {} {} ({:?})", T::table_name(), id, mode);
        Ok(updated)
    }

    /// Soft delete: stamp `deleted_at` and invalidate.
    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        self.set_deleted_at(raw_id, true).await
    }

    /// Clear `deleted_at` and invalidate.
    pub async fn restore(&self, raw_id: &str) -> Result<()> {
        self.set_deleted_at(raw_id, false).await
    }

    async fn set_deleted_at(&self, raw_id: &str, deleted: bool) -> Result<()> {
        let id = T::parse_id(raw_id)?;
        let at = deleted.then(Utc::now);

        let affected = self.bounded(self.store.set_deleted_at(&id, at)).await?;
        if affected == 0 {
            return Err(Error::not_found(T::table_name(), id));
        }

        self.cache
            .invalidate(&CacheKeyBuilder::build::<T>(&id))
            .await;

        if deleted {
            info!("Soft-deleted {} {}", T::table_name(), id);
        } else {
            info!("Restored {} {}", T::table_name(), id);
        }
        Ok(())
    }

    async fn bounded<R>(&self, fut: impl Future<Output = Result<R>>) -> Result<R> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "{} store call exceeded {:?}",
                    T::table_name(),
                    self.timeout
                );
                Err(Error::Timeout(format!(
                    "{} store call exceeded {:?}",
                    T::table_name(),
                    self.timeout
                )))
            }
        }
    }
}

fn into_patch(payload: Value) -> Result<Patch> {
    match payload {
        Value::Object(fields) => Ok(fields),
        _ => Err(Error::InvalidInput(
            "partial update body must be a JSON object".to_string(),
        )),
    }
}
