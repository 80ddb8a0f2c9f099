//! Store traits for abstracting relational access.
//!
//! The [`Store`] trait decouples the dispatcher from a specific database. Two
//! implementations ship with the crate:
//!
//! - [`PgStore`]: PostgreSQL through sqlx (feature `postgres`)
//! - [`InMemoryStore`]: a `BTreeMap` behind a tokio `RwLock`, for tests and
//!   local runs
//!
//! # Error Handling
//!
//! Implementations return `Err` for connectivity failures, constraint
//! violations and anything else the database rejects. An absent row is never
//! an error: reads return `Ok(None)` and conditional writes report zero rows.

use crate::entity::{Patch, Record};
use crate::error::Result;
use crate::models::User;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod inmemory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use inmemory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Which rows a read may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Only rows with `deleted_at IS NULL`.
    Live,
    /// Every stored row, soft-deleted ones included.
    All,
}

impl Scope {
    pub fn including_deleted(include_deleted: bool) -> Self {
        if include_deleted {
            Scope::All
        } else {
            Scope::Live
        }
    }

    /// True when `record` is visible under this scope.
    pub fn admits<T: Record>(self, record: &T) -> bool {
        match self {
            Scope::Live => record.is_live(),
            Scope::All => true,
        }
    }
}

/// Persistent storage for one record type.
///
/// Object safe, so a dispatcher holds an `Arc<dyn Store<T>>` chosen at
/// startup.
#[async_trait]
pub trait Store<T: Record>: Send + Sync {
    /// Insert a new row and return it with its generated id and timestamps.
    async fn create(&self, draft: &T::Draft) -> Result<T>;

    /// Load one row.
    ///
    /// # Returns
    /// - `Ok(Some(row))` - Row found and visible under `scope`
    /// - `Ok(None)` - No such row (not an error)
    async fn find_by_id(&self, id: &T::Id, scope: Scope) -> Result<Option<T>>;

    /// Every row visible under `scope`, in ascending id order.
    async fn find_all(&self, scope: Scope) -> Result<Vec<T>>;

    /// Overwrite all bindable columns and bump `updated_at`.
    ///
    /// Ignores the soft-delete flag. `Ok(None)` when the row does not exist.
    async fn update(&self, id: &T::Id, draft: &T::Draft) -> Result<Option<T>>;

    /// Write only the columns present in `patch` and bump `updated_at`.
    ///
    /// Keys are bindable columns; callers check them first.
    async fn update_fields(&self, id: &T::Id, patch: &Patch) -> Result<Option<T>>;

    /// `UPDATE ... SET deleted_at = $at WHERE id = $id` as one statement.
    ///
    /// Returns the number of rows affected, 0 when the id is unknown.
    async fn set_deleted_at(&self, id: &T::Id, at: Option<DateTime<Utc>>) -> Result<u64>;
}

/// Credential lookup for login.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The live user with this username, if any.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}
