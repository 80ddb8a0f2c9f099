//! Per-entity services layered over the generic dispatcher.

pub mod product;
pub mod user;

pub use product::ProductService;
pub use user::{Credentials, Registered, TokenResponse, UserService};
