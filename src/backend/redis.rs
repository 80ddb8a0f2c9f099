//! Redis cache backend implementation.

use super::CacheBackend;
use crate::error::{Error, Result};
use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config as PoolConfig, Pool, Runtime};
use std::time::Duration;

/// Default Redis connection pool size.
const DEFAULT_POOL_SIZE: u32 = 16;

/// Configuration for Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    /// Upper bound on waiting for, or opening, a pooled connection.
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            url: "redis://localhost:6379/0".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis backend with connection pooling and async operations.
///
/// Uses deadpool for async connection pooling. TTLs are applied with
/// `SET EX`, so expiry is enforced by the server.
///
/// # Example
///
/// ```no_run
/// # use crud_kit::backend::{RedisBackend, RedisConfig, CacheBackend};
/// # use crud_kit::error::Result;
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::new(RedisConfig::default())?;
///
/// backend.set("products:1", b"value".to_vec(), None).await?;
/// let value = backend.get("products:1").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create new Redis backend from configuration.
    ///
    /// Connections are opened lazily; call [`CacheBackend::health_check`] to
    /// verify the server is reachable.
    ///
    /// # Errors
    /// Returns `Err` if the URL is invalid or pool creation fails.
    pub fn new(config: RedisConfig) -> Result<Self> {
        let mut cfg = PoolConfig::from_url(config.url.as_str());
        let mut pool_cfg = deadpool_redis::PoolConfig::new(config.pool_size as usize);
        pool_cfg.timeouts.wait = Some(config.connection_timeout);
        pool_cfg.timeouts.create = Some(config.connection_timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "Redis backend initialized (pool size: {})",
            config.pool_size
        );

        Ok(RedisBackend { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::BackendError(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| Error::BackendError(format!("Redis GET failed for key {}: {}", key, e)))?;

        if value.is_some() {
            debug!("Redis GET {} -> HIT", key);
        } else {
            debug!("Redis GET {} -> MISS", key);
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;

        match ttl {
            Some(duration) => {
                // SET EX rejects 0; round sub-second TTLs up.
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(|e| {
                        Error::BackendError(format!("Redis SET_EX failed for key {}: {}", key, e))
                    })?;
                debug!("Redis SET {} (TTL: {}s)", key, seconds);
            }
            None => {
                conn.set::<_, _, ()>(key, value).await.map_err(|e| {
                    Error::BackendError(format!("Redis SET failed for key {}: {}", key, e))
                })?;
                debug!("Redis SET {}", key);
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::BackendError(format!("Redis DEL failed for key {}: {}", key, e)))?;

        debug!("Redis DELETE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let exists: bool = conn.exists(key).await.map_err(|e| {
            Error::BackendError(format!("Redis EXISTS failed for key {}: {}", key, e))
        })?;

        Ok(exists)
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;

        let pong: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis PING failed: {}", e)))?;

        Ok(pong.contains("PONG"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_default() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379/0");
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_redis_backend_new_is_lazy() {
        // Nothing listens on this port; pool creation must still succeed.
        let backend = RedisBackend::new(RedisConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
            pool_size: 2,
            connection_timeout: Duration::from_millis(200),
        })
        .expect("pool creation should not connect");

        assert_eq!(backend.pool.status().size, 0);
        assert!(matches!(
            backend.get("products:1").await,
            Err(Error::BackendError(_))
        ));
    }

    // Integration tests - require running Redis server
    // Run with: cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_redis_backend_set_get_delete() {
        let backend = RedisBackend::new(RedisConfig::default()).expect("Failed to create backend");

        backend
            .set("test:1", b"test_value".to_vec(), Some(Duration::from_secs(60)))
            .await
            .expect("Failed to set");
        assert_eq!(
            backend.get("test:1").await.expect("Failed to get"),
            Some(b"test_value".to_vec())
        );

        backend.delete("test:1").await.expect("Failed to delete");
        assert_eq!(backend.get("test:1").await.expect("Failed to get"), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_backend_ttl() {
        let backend = RedisBackend::new(RedisConfig::default()).expect("Failed to create backend");

        backend
            .set("ttl_key", b"expires_soon".to_vec(), Some(Duration::from_secs(1)))
            .await
            .expect("Failed to set");
        assert!(backend.exists("ttl_key").await.expect("Failed to check"));

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(backend.get("ttl_key").await.expect("Failed to get"), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_redis_backend_health_check() {
        let backend = RedisBackend::new(RedisConfig::default()).expect("Failed to create backend");
        assert!(backend.health_check().await.expect("Failed to check health"));
    }
}
