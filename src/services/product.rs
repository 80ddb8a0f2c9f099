//! Products need nothing beyond the generic operations.

use crate::dispatcher::Dispatcher;
use crate::gateway::CacheGateway;
use crate::models::Product;
use crate::repository::Store;
use std::sync::Arc;

/// Product CRUD: create, get, list, update, delete, restore.
pub type ProductService = Dispatcher<Product>;

impl Dispatcher<Product> {
    /// Product service over `store`, sharing `cache` with the other services.
    pub fn for_products(store: Arc<dyn Store<Product>>, cache: CacheGateway) -> ProductService {
        log::info!("[Service] Product service ready");
        Dispatcher::new(store, cache)
    }
}
