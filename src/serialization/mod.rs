//! Versioned cache envelopes.
//!
//! Every cache entry written by crud-kit follows this layout:
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│  JSON PAYLOAD (N bytes)  │
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "CRUD"              u32 (LE)           serde_json::to_vec(T)
//! ```
//!
//! The payload is the entity's own wire representation, so a cached snapshot
//! and an HTTP response body for the same row are the same JSON document.
//! Entities rely on `skip_serializing_if` for nullable columns, which rules
//! out non-self-describing formats here.
//!
//! # Example
//!
//! ```rust
//! use crud_kit::serialization::{serialize_for_cache, deserialize_from_cache};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Row {
//!     id: i64,
//!     name: String,
//! }
//!
//! # fn main() -> crud_kit::Result<()> {
//! let row = Row { id: 1, name: "Alice".to_string() };
//! let bytes = serialize_for_cache(&row)?;
//! assert_eq!(&bytes[0..4], b"CRUD");
//!
//! let back: Row = deserialize_from_cache(&bytes)?;
//! assert_eq!(row, back);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic header for crud-kit cache entries.
pub const CACHE_MAGIC: [u8; 4] = *b"CRUD";

/// Current schema version.
///
/// Bump when a cached entity changes shape incompatibly. Entries written with
/// another version are rejected on read and recomputed from the store.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// Serialize a value with envelope for cache storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if JSON encoding fails.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&CACHE_MAGIC);
    bytes.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize a value from cache storage, validating the envelope first.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: truncated header or wrong magic
/// - `Error::VersionMismatch`: entry written by another schema version
/// - `Error::DeserializationError`: corrupted JSON payload
pub fn deserialize_from_cache<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::InvalidCacheEntry(format!(
            "entry too short: {} bytes",
            bytes.len()
        )));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);
    let (magic, version) = header.split_at(4);

    if magic != CACHE_MAGIC {
        warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC, magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, magic
        )));
    }

    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(version);
    let found = u32::from_le_bytes(version_bytes);
    if found != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, found
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found,
        });
    }

    serde_json::from_slice(payload).map_err(|e| {
        error!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })
}
