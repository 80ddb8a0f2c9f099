//! # crud-kit
//!
//! Generic soft-delete CRUD over a relational store, with a read-through
//! cache in front of single-row reads.
//!
//! ## Layers
//!
//! - [`Entity`] / [`Record`]: what a persisted type must expose
//! - [`repository::Store`]: relational access, PostgreSQL or in-memory
//! - [`backend::CacheBackend`]: key-value cache, Redis or in-memory
//! - [`CacheGateway`]: best-effort cache access (failures become misses)
//! - [`Dispatcher`]: create, get, list, update, delete, restore for any [`Record`]
//! - [`http`]: axum router with JWT-gated routes, tracing and metrics
//!
//! ## Quick Start
//!
//! ```no_run
//! use crud_kit::backend::InMemoryBackend;
//! use crud_kit::models::Product;
//! use crud_kit::repository::InMemoryStore;
//! use crud_kit::{CacheGateway, Dispatcher};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> crud_kit::Result<()> {
//! let gateway = CacheGateway::new(Arc::new(InMemoryBackend::new()));
//! let products = Dispatcher::new(Arc::new(InMemoryStore::<Product>::new()), gateway);
//!
//! let created = products
//!     .create(json!({"name": "Test Product", "price": 99.99, "stock": 100}))
//!     .await?;
//!
//! // First read goes to the store and populates "products:1".
//! let fetched = products.get(&created.id.to_string()).await?;
//! assert_eq!(fetched, created);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod auth;
pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod http;
pub mod key;
pub mod models;
pub mod observability;
pub mod repository;
pub mod serialization;
pub mod services;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use dispatcher::{Dispatcher, UpdateMode};
pub use entity::{Entity, Patch, Record};
pub use error::{Error, Result};
pub use gateway::CacheGateway;
pub use key::CacheKeyBuilder;
pub use services::{ProductService, UserService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
