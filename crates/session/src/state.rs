//! Session state machine and event types

use serde::{Deserialize, Serialize};
use sommelier_core::ToolName;

/// Lifecycle of a voice session.
///
/// `Idle` and `Disconnected` are rest states: derived UI state is empty
/// there. `Error` is terminal for the session but never for the cart,
/// which outlives every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::Error => "error",
        }
    }

    /// Rest states hold no derived UI state.
    pub fn is_rest(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Disconnected)
    }

    /// Whether tool calls may be submitted in this state.
    pub fn accepts_tool_calls(&self) -> bool {
        matches!(self, SessionState::Connected)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session events broadcast to observers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session established and dispatch running.
    Started { session_id: String },
    /// State transition.
    StateChanged {
        old: SessionState,
        new: SessionState,
    },
    /// A tool call completed and its result was applied.
    ToolCompleted {
        call_id: String,
        name: ToolName,
        count: usize,
    },
    /// A tool call failed; UI state was left untouched.
    ToolFailed {
        call_id: String,
        name: ToolName,
        message: String,
    },
    /// Session ended.
    Ended { reason: String },
}
