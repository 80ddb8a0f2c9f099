//! Metrics hooks and TTL policies for the cache gateway.
//!
//! - **Metrics (`CacheMetrics`)**: hits, misses, writes, invalidations, errors
//! - **TTL Policies (`TtlPolicy`)**: how long populated entries live
//!
//! [`PrometheusMetrics`] forwards every hook to the `metrics` facade; the
//! binary installs a Prometheus recorder and serves it on `/metrics`.
//!
//! ```
//! use crud_kit::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! let policy = TtlPolicy::PerType(|table| match table {
//!     "users" => Duration::from_secs(600),
//!     _ => Duration::from_secs(3600),
//! });
//! assert_eq!(policy.get_ttl("products"), Some(Duration::from_secs(3600)));
//! ```

use crate::key::CacheKeyBuilder;
use std::time::Duration;

/// Trait for cache metrics collection.
///
/// Default methods log through the `log` facade.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache set operation.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a cache delete operation.
    fn record_delete(&self, key: &str, duration: Duration) {
        debug!("Cache DELETE: {} took {:?}", key, duration);
    }

    /// Record an error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Metrics implementation that records nothing.
///
/// Errors still go to the log through the trait's default `record_error`.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _duration: Duration) {}
}

/// Cache metrics exported through the `metrics` facade.
///
/// Labels carry the table name only; per-id labels would explode cardinality.
#[derive(Clone, Default)]
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    fn observe(op: &'static str, key: &str, duration: Duration) {
        let labels = [
            ("table", CacheKeyBuilder::table_of(key).to_owned()),
            ("op", op.to_owned()),
        ];
        metrics::histogram!("cache_operation_duration_seconds", &labels)
            .record(duration.as_secs_f64());
    }
}

impl CacheMetrics for PrometheusMetrics {
    fn record_hit(&self, key: &str, duration: Duration) {
        let table = CacheKeyBuilder::table_of(key).to_owned();
        metrics::counter!("cache_hits_total", "table" => table).increment(1);
        Self::observe("get", key, duration);
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        let table = CacheKeyBuilder::table_of(key).to_owned();
        metrics::counter!("cache_misses_total", "table" => table).increment(1);
        Self::observe("get", key, duration);
    }

    fn record_set(&self, key: &str, duration: Duration) {
        Self::observe("set", key, duration);
    }

    fn record_delete(&self, key: &str, duration: Duration) {
        Self::observe("delete", key, duration);
    }

    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
        let table = CacheKeyBuilder::table_of(key).to_owned();
        metrics::counter!("cache_errors_total", "table" => table).increment(1);
    }
}

/// TTL (Time-to-Live) policy for cache entries.
#[derive(Clone, Debug)]
pub enum TtlPolicy {
    /// Fixed duration for all entries
    Fixed(Duration),

    /// No TTL (entries live until invalidated)
    Infinite,

    /// Custom per-table policy
    PerType(fn(&str) -> Duration),
}

impl Default for TtlPolicy {
    fn default() -> Self {
        TtlPolicy::Fixed(Duration::from_secs(3600))
    }
}

impl TtlPolicy {
    /// Get TTL for a table.
    pub fn get_ttl(&self, table: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::Infinite => None,
            TtlPolicy::PerType(f) => Some(f(table)),
        }
    }
}
