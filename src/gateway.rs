//! Read-through cache gateway.
//!
//! The gateway never fails a request. Backend errors, timeouts and
//! undecodable entries are recorded through [`CacheMetrics`] and reported to
//! the caller as a miss (reads) or silently dropped (writes, invalidations).
//! The store stays authoritative; a failed invalidation leaves a stale entry
//! for at most its TTL.

use crate::backend::CacheBackend;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort cache access shared by every dispatcher.
///
/// Cloning is cheap: backend and metrics sit behind `Arc`.
///
/// # Example
///
/// ```ignore
/// let gateway = CacheGateway::new(Arc::new(InMemoryBackend::new()))
///     .with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(3600)));
///
/// let key = CacheKeyBuilder::build::<Product>(&1);
/// if let Some(product) = gateway.fetch::<Product>(&key).await { /* hit */ }
/// ```
#[derive(Clone)]
pub struct CacheGateway {
    backend: Arc<dyn CacheBackend>,
    metrics: Arc<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    timeout: Duration,
}

impl CacheGateway {
    /// Create a gateway over `backend` with a one-hour TTL and no metrics.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        CacheGateway {
            backend,
            metrics: Arc::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Upper bound for a single backend call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// TTL applied when populating entries of table `T`.
    pub fn ttl_for<T: Entity>(&self) -> Option<Duration> {
        self.ttl_policy.get_ttl(T::table_name())
    }

    /// Look up `key` and decode it as `T`.
    ///
    /// Returns `None` on a miss and on any failure: backend error, timeout,
    /// bad envelope, undecodable payload.
    pub async fn fetch<T: Entity>(&self, key: &str) -> Option<T> {
        let timer = Instant::now();

        let bytes = match self.bounded(self.backend.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.metrics.record_miss(key, timer.elapsed());
                return None;
            }
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return None;
            }
        };

        match T::deserialize_from_cache(&bytes) {
            Ok(entity) => {
                self.metrics.record_hit(key, timer.elapsed());
                Some(entity)
            }
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                debug!("Treating undecodable entry {} as a miss", key);
                None
            }
        }
    }

    /// Serialize `entity` and store it under `key` with the table's TTL.
    pub async fn populate<T: Entity>(&self, key: &str, entity: &T) {
        let timer = Instant::now();
        let ttl = self.ttl_for::<T>();

        let result = match entity.serialize_for_cache() {
            Ok(bytes) => self.bounded(self.backend.set(key, bytes, ttl)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.metrics.record_set(key, timer.elapsed()),
            Err(e) => self.metrics.record_error(key, &e.to_string()),
        }
    }

    /// Delete `key`.
    pub async fn invalidate(&self, key: &str) {
        let timer = Instant::now();

        match self.bounded(self.backend.delete(key)).await {
            Ok(()) => {
                self.metrics.record_delete(key, timer.elapsed());
                debug!("Cache invalidated for {}", key);
            }
            Err(e) => self.metrics.record_error(key, &e.to_string()),
        }
    }

    /// Backend liveness, for readiness probes.
    pub async fn health_check(&self) -> bool {
        match self.bounded(self.backend.health_check()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                false
            }
        }
    }

    async fn bounded<R>(&self, fut: impl Future<Output = Result<R>>) -> Result<R> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "cache call exceeded {:?}",
                self.timeout
            ))),
        }
    }
}
