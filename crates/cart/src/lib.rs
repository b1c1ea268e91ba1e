//! Durable cart store
//!
//! The cart outlives the voice session: it persists across sessions and
//! reloads, is keyed by wine id, and is the single source of truth for
//! the cart-count indicator and the cart page. Writes publish a typed
//! change event on a broadcast channel; other browsing contexts backed by
//! the same store re-read it on signal receipt instead of polling.

pub mod store;

pub use store::{CartEvent, CartStore, SqliteCartStore};

use thiserror::Error;

/// Cart store errors
#[derive(Error, Debug)]
pub enum CartError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("no cart item for wine {0}")]
    NotFound(i64),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("blocking task failed: {0}")]
    Join(String),
}

impl From<CartError> for sommelier_core::Error {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Validation(msg) => sommelier_core::Error::Validation(msg),
            CartError::NotFound(id) => {
                sommelier_core::Error::NotFound(format!("cart item for wine {id}"))
            }
            other => sommelier_core::Error::Cart(other.to_string()),
        }
    }
}
