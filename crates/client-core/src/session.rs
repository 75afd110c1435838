//! Session lifecycle state
//!
//! A session moves through a fixed set of states:
//!
//! ```text
//!   Init ──connect──► Connecting ──opened──► Open
//!                        │                    │
//!                        │ auth/transport     │ disconnect / remote close
//!                        │ failure            ▼
//!                        ├──────────────►  Closing ──► Closed
//!                        ▼                                │
//!                      Closed ◄───────────────────────────┘
//!                        │
//!                        └──connect──► Connecting
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current state of the client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Client created, never connected
    Init,
    /// Connect requested, waiting for the room service to accept
    Connecting,
    /// Session established, media is flowing
    Open,
    /// Teardown in progress
    Closing,
    /// Session ended; a new connect is allowed
    Closed,
}

impl SessionState {
    /// Check whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Init, Connecting)
                | (Closed, Connecting)
                | (Connecting, Open)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Open, Closing)
                | (Closing, Closed)
        )
    }

    /// Check if the session can carry media and SDK calls
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    /// Check if a new connect may be started from this state
    pub fn can_connect(&self) -> bool {
        matches!(self, SessionState::Init | SessionState::Closed)
    }

    /// Check if the session is being torn down or already gone
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closing | SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
