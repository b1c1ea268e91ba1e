//! Error taxonomy shared across the workspace
//!
//! Component crates define their own error enums and map into these
//! variants at crate boundaries. The classes mirror how failures are
//! contained: a bad tool argument or a dropped audio frame never cascades
//! into session-level failure.

use thiserror::Error;

/// Workspace-wide error classes
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Malformed tool arguments or filter shape. Reported back to the
    /// caller without side effects.
    #[error("validation error: {0}")]
    Validation(String),

    /// No matching record (e.g. `get_wine` with an unknown name).
    #[error("not found: {0}")]
    NotFound(String),

    /// Catalog store or an external service unreachable or erroring.
    /// Recoverable and displayable; never tears the session down on its own.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Invalid sample-rate parameters on the audio path. The offending
    /// frame is dropped and streaming continues.
    #[error("transcode error: {0}")]
    Transcode(String),

    /// Session establishment or lifecycle failure.
    #[error("session error: {0}")]
    Session(String),

    /// Cart store failure.
    #[error("cart error: {0}")]
    Cart(String),
}

impl Error {
    /// Whether the surrounding UI should treat this as retryable while the
    /// conversation continues.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Session(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
