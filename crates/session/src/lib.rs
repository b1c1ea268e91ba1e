//! Conversation session controller
//!
//! Owns the session state machine and the single-flight tool-call
//! dispatch loop. UI consumers observe the session through a `watch`
//! channel of [`sommelier_core::ShopState`] snapshots and a `broadcast`
//! stream of [`SessionEvent`]s; the voice service feeds it through an
//! `mpsc` channel of [`sommelier_core::ToolCallEvent`]s.

pub mod avatar;
pub mod controller;
pub mod state;

pub use avatar::{AvatarSession, AvatarSessionClient};
pub use controller::ConversationStateController;
pub use state::{SessionEvent, SessionState};

use thiserror::Error;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session is {0}, expected connected")]
    NotConnected(SessionState),

    #[error("session is already {0}")]
    AlreadyActive(SessionState),

    #[error("session establishment timed out after {0}ms")]
    ConnectTimeout(u64),

    #[error("avatar provider error: {0}")]
    Avatar(String),

    #[error("dispatch channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Cart(#[from] sommelier_cart::CartError),
}

impl From<SessionError> for sommelier_core::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotConnected(state) => {
                sommelier_core::Error::Session(format!("session is {state}, expected connected"))
            }
            SessionError::AlreadyActive(state) => {
                sommelier_core::Error::Session(format!("session is already {state}"))
            }
            SessionError::ConnectTimeout(ms) => {
                sommelier_core::Error::Session(format!("establishment timed out after {ms}ms"))
            }
            // Avatar failures are recoverable; the shop works without video.
            SessionError::Avatar(msg) => sommelier_core::Error::Upstream(msg),
            SessionError::ChannelClosed => {
                sommelier_core::Error::Session("dispatch channel closed".into())
            }
            SessionError::Cart(e) => e.into(),
        }
    }
}
