//! Entity contract implemented by every persisted type.
//!
//! [`Entity`] is the minimal capability the cache layer needs: an identifier
//! and the name of the table the row lives in. [`Record`] extends it with the
//! persistable shape the generic dispatcher and the stores work against.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

/// Sparse set of column updates, keyed by column name.
pub type Patch = Map<String, Value>;

/// Trait that every persisted and cached type must implement.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use crud_kit::Entity;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct Invoice {
///     pub id: i64,
///     pub total: f64,
/// }
///
/// impl Entity for Invoice {
///     type Id = i64;
///
///     fn id(&self) -> Self::Id {
///         self.id
///     }
///
///     fn table_name() -> &'static str {
///         "invoices"
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Serialize + DeserializeOwned + Clone + 'static {
    /// Type of the entity's identifier.
    type Id: Display + Debug + FromStr + Clone + Copy + Send + Sync + Eq + Hash + Ord + 'static;

    /// Return the entity's identifier.
    fn id(&self) -> Self::Id;

    /// Storage table name. Also the cache-key namespace: `"{table}:{id}"`.
    fn table_name() -> &'static str;

    /// Serialize entity for cache storage.
    ///
    /// See `crate::serialization` for the envelope format.
    fn serialize_for_cache(&self) -> Result<Vec<u8>> {
        crate::serialization::serialize_for_cache(self)
    }

    /// Deserialize entity from cache storage, validating the envelope.
    fn deserialize_from_cache(bytes: &[u8]) -> Result<Self> {
        crate::serialization::deserialize_from_cache(bytes)
    }

    /// Parse an identifier received as text (path segment, cache key).
    fn parse_id(raw: &str) -> Result<Self::Id> {
        raw.parse()
            .map_err(|_| Error::InvalidInput(format!("invalid id: {:?}", raw)))
    }
}

/// A soft-deletable row with a client-supplied draft shape.
///
/// `Draft` is what clients send on create and full update: every bindable
/// column and nothing the store owns (`id`, timestamps).
pub trait Record: Entity {
    /// Client payload for create and full update.
    type Draft: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Columns a client may write. Partial updates are restricted to these.
    const COLUMNS: &'static [&'static str];

    /// Build a new row from a draft. Used by stores that assign ids themselves.
    fn from_draft(id: Self::Id, draft: Self::Draft, now: DateTime<Utc>) -> Self;

    /// Overwrite every bindable column from a draft.
    fn apply_draft(&mut self, draft: Self::Draft);

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>);

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// `deleted_at == None`.
    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }

    /// Validate and normalize a draft before it reaches the store.
    fn prepare_draft(_draft: &mut Self::Draft) -> Result<()> {
        Ok(())
    }

    /// Validate and normalize a partial update before it reaches the store.
    ///
    /// Keys have already been checked against [`Record::COLUMNS`].
    fn prepare_patch(_patch: &mut Patch) -> Result<()> {
        Ok(())
    }

    /// Apply a sparse update in memory.
    ///
    /// Also used to type-check a patch against the loaded row before the store
    /// writes it.
    fn apply_patch(&mut self, patch: &Patch) -> Result<()> {
        *self = merge_patch(self, patch)?;
        Ok(())
    }
}

/// Overlay `patch` onto the JSON form of `current` and decode the result.
///
/// # Errors
///
/// `Error::InvalidInput` when a patched value has the wrong type for its
/// column.
pub fn merge_patch<T: Serialize + DeserializeOwned>(current: &T, patch: &Patch) -> Result<T> {
    let mut value = serde_json::to_value(current)?;
    if let Value::Object(fields) = &mut value {
        for (column, v) in patch {
            fields.insert(column.clone(), v.clone());
        }
    }
    serde_json::from_value(value).map_err(|e| Error::InvalidInput(format!("invalid field: {}", e)))
}

/// Reject any patch key that is not a bindable column of `T`.
pub fn check_columns<T: Record>(patch: &Patch) -> Result<()> {
    match patch.keys().find(|k| !T::COLUMNS.contains(&k.as_str())) {
        Some(unknown) => Err(Error::InvalidInput(format!(
            "unknown or read-only field: {}",
            unknown
        ))),
        None => Ok(()),
    }
}
