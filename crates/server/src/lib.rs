//! Sommelier backend server
//!
//! HTTP endpoints for the voice widget: session lifecycle, shop state
//! snapshots, direct tool invocation for the voice service, and the
//! durable cart.

pub mod http;
pub mod session;
pub mod state;

pub use http::create_router;
pub use session::SessionManager;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session error: {0}")]
    Session(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] sommelier_catalog::CatalogError),

    #[error("cart error: {0}")]
    Cart(#[from] sommelier_cart::CartError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Catalog(sommelier_catalog::CatalogError::NotFound(_)) => {
                axum::http::StatusCode::NOT_FOUND
            }
            ServerError::Catalog(sommelier_catalog::CatalogError::Validation(_)) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            ServerError::Cart(sommelier_cart::CartError::NotFound(_)) => {
                axum::http::StatusCode::NOT_FOUND
            }
            ServerError::Cart(sommelier_cart::CartError::Validation(_)) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
