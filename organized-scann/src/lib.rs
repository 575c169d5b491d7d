//! # organized-scann
//!
//! REST API for a motorcycle maintenance yard: motorcycles, the portals they
//! enter through, and the users operating the yard.
//!
//! ## Features
//!
//! - **Listings**: clamped pagination, exact-match filters, count and fetch from one snapshot
//! - **Hypermedia**: every resource response wrapped as `{ data, links }`
//! - **Auth**: Argon2id passwords, HS256 bearer tokens, role-gated routes
//! - **Storage**: PostgreSQL via sqlx, or process memory when no database is configured
//! - **Predictions**: least-squares maintenance estimates and k-means patterns
//! - **Operations**: JSON logs, request ids, health probes, graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use organized_scann::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::builder().config(config.clone()).build().await?;
//!
//!     Server::new(config).serve(build_router(state)).await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod prediction;
pub mod repository;
pub mod routes;
pub mod server;
pub mod state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{Identity, PasswordHasher, TokenService};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{Envelope, Link, Page, PageRequest, Resource};
    pub use crate::models::{Motorcycle, Portal, PortalType, Role, User};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{Gateway, Pagination, Predicate, Repository};
    pub use crate::routes::build_router;
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};
}
