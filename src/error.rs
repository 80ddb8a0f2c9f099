//! Error types shared by the store, cache and dispatcher layers.

use std::fmt;

/// Result type for crud-kit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for crud-kit.
///
/// The HTTP layer classifies these into status codes: `InvalidInput` is a 400,
/// `Unauthorized` a 401, `NotFound` a 404 and everything else a 500.
#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed identifier, malformed payload or missing required field.
    InvalidInput(String),

    /// Bad credentials, or a missing/invalid bearer token.
    Unauthorized(String),

    /// No live row matched the identifier, or a conditional update matched
    /// zero rows.
    NotFound(String),

    /// Serialization failed when converting an entity to cache bytes.
    SerializationError(String),

    /// Deserialization failed when converting cache bytes to an entity.
    ///
    /// The gateway treats this as a cache miss; the entry is overwritten by
    /// the next populate.
    DeserializationError(String),

    /// Cache backend error (Redis connection lost, pool exhausted, ...).
    ///
    /// Never fatal to a request: reads degrade to the store, writes and
    /// invalidations are logged and dropped.
    BackendError(String),

    /// Relational store error.
    ///
    /// Fatal to the request that issued it.
    RepositoryError(String),

    /// A store or cache call exceeded the configured operation timeout.
    Timeout(String),

    /// Invalid configuration at startup.
    ConfigError(String),

    /// Invalid cache entry: bad magic or truncated envelope.
    InvalidCacheEntry(String),

    /// Cache entry written by a different schema version.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },
}

impl Error {
    /// `NotFound` for a table/id pair, with the message used on the wire.
    pub fn not_found(table: &str, id: impl fmt::Display) -> Self {
        Error::NotFound(format!("{} {} not found", table, id))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "{}", msg),
            Error::Unauthorized(msg) => write!(f, "{}", msg),
            Error::NotFound(msg) => write!(f, "{}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Error::NotFound("record not found".to_string()),
            sqlx::Error::PoolTimedOut => Error::Timeout("database pool timed out".to_string()),
            other => Error::RepositoryError(other.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
