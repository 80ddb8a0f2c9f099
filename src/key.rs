//! Cache key derivation.
//!
//! Keys have the form `"{table}:{id}"`. The read path and every invalidation
//! path go through [`CacheKeyBuilder::build`], so an entry written on a miss is
//! always the one a later write deletes.

use crate::entity::Entity;
use std::fmt::Display;

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build full cache key from entity type and ID.
    pub fn build<T: Entity>(id: &T::Id) -> String {
        Self::build_with_table(T::table_name(), id)
    }

    /// Build cache key from an explicit table name.
    pub fn build_with_table(table: &str, id: &dyn Display) -> String {
        format!("{}:{}", table, id)
    }

    /// Split a key back into `(table, id)`.
    ///
    /// Only the first `:` separates; anything after it belongs to the id.
    pub fn parse(key: &str) -> Option<(&str, &str)> {
        key.split_once(':')
    }

    /// Table portion of a key, used as a metrics label.
    pub fn table_of(key: &str) -> &str {
        Self::parse(key).map_or(key, |(table, _)| table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Serialize, Deserialize)]
    struct Order {
        id: i64,
    }

    impl Entity for Order {
        type Id = i64;

        fn id(&self) -> Self::Id {
            self.id
        }

        fn table_name() -> &'static str {
            "orders"
        }
    }

    #[test]
    fn test_cache_key_builder() {
        let key = CacheKeyBuilder::build::<Order>(&123);
        assert_eq!(key, "orders:123");
    }

    #[test]
    fn test_build_matches_explicit_table() {
        let order = Order { id: 9 };
        assert_eq!(
            CacheKeyBuilder::build::<Order>(&order.id()),
            CacheKeyBuilder::build_with_table("orders", &9)
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(CacheKeyBuilder::parse("orders:12"), Some(("orders", "12")));
        assert_eq!(CacheKeyBuilder::parse("a:b:c"), Some(("a", "b:c")));
        assert_eq!(CacheKeyBuilder::parse("plain"), None);
    }

    #[test]
    fn test_table_of() {
        assert_eq!(CacheKeyBuilder::table_of("products:1"), "products");
        assert_eq!(CacheKeyBuilder::table_of("plain"), "plain");
    }
}
