//! Wine catalog query engine
//!
//! SQLite-backed, filter-driven queries with per-use-case ranking
//! policies. Queries are built from enumerated predicate kinds and bound
//! parameters, never from concatenated values. Blocking database work
//! runs on the blocking pool so engine calls stay non-blocking for the
//! event loop.

pub mod engine;
pub mod pool;
pub mod predicate;
pub mod schema;

pub use engine::{CatalogQueryEngine, Recommendation, UseCase};
pub use pool::{create_pool, CatalogPool};
pub use predicate::{Predicate, QueryBuilder};
pub use schema::{ensure_schema, insert_wine, seed_demo_catalog, seed_demo_catalog_if_empty};

use thiserror::Error;

/// Catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no wine found: {0}")]
    NotFound(String),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking task failed: {0}")]
    Join(String),
}

impl From<CatalogError> for sommelier_core::Error {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => sommelier_core::Error::Validation(msg),
            CatalogError::NotFound(msg) => sommelier_core::Error::NotFound(msg),
            CatalogError::Pool(e) => sommelier_core::Error::Upstream(e.to_string()),
            CatalogError::Sqlite(e) => sommelier_core::Error::Upstream(e.to_string()),
            CatalogError::Join(msg) => sommelier_core::Error::Upstream(msg),
        }
    }
}
