//! Error types for client-core operations
//!
//! Every fallible operation on [`Client`](crate::Client) returns a
//! [`ClientResult`]. Errors are plain values: the library never retries on
//! its own, and asynchronous failures reported by the transport are also
//! delivered to event handlers as [`ClientEvent::Error`](crate::ClientEvent).
//!
//! ```rust
//! use roomkit_client_core::{ClientError, SessionState};
//!
//! let error = ClientError::InvalidState {
//!     operation: "change_mute".to_string(),
//!     state: SessionState::Closed,
//! };
//! assert_eq!(error.category(), "state");
//! assert!(!error.is_recoverable());
//! ```

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Error types for room session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The access token was empty, malformed or rejected by the room service
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Operation {operation} not allowed in state {state}")]
    InvalidState {
        operation: String,
        state: SessionState,
    },

    #[error("Track not found: {track_id}")]
    TrackNotFound { track_id: String },

    #[error("Remote connection not found: {connection_id}")]
    ConnectionNotFound { connection_id: String },

    /// Configuration errors
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Missing required configuration: {field}")]
    MissingConfiguration { field: String },

    /// Transport errors
    #[error("Transport failed: {reason}")]
    TransportFailed { reason: String },

    #[error("Network error: {reason}")]
    NetworkError { reason: String },

    #[error("Signaling protocol error: {reason}")]
    ProtocolError { reason: String },

    #[error("Operation timeout after {duration_ms}ms")]
    OperationTimeout { duration_ms: u64 },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ClientError {
    pub fn authentication_failed(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed { reason: reason.into() }
    }

    pub fn invalid_state(operation: impl Into<String>, state: SessionState) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state,
        }
    }

    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn transport_failed(reason: impl Into<String>) -> Self {
        Self::TransportFailed { reason: reason.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }

    /// Check if retrying the same operation later could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::NetworkError { .. }
                | ClientError::TransportFailed { .. }
                | ClientError::OperationTimeout { .. }
        )
    }

    /// Coarse grouping used in logs and error reports
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::AuthenticationFailed { .. } => "auth",
            ClientError::InvalidState { .. } => "state",
            ClientError::TrackNotFound { .. } => "media",
            ClientError::ConnectionNotFound { .. } => "connection",
            ClientError::InvalidConfiguration { .. } | ClientError::MissingConfiguration { .. } => {
                "configuration"
            }
            ClientError::TransportFailed { .. }
            | ClientError::NetworkError { .. }
            | ClientError::OperationTimeout { .. } => "network",
            ClientError::ProtocolError { .. } => "protocol",
            ClientError::InternalError { .. } => "internal",
        }
    }
}

impl From<roomkit_token_core::TokenError> for ClientError {
    fn from(err: roomkit_token_core::TokenError) -> Self {
        ClientError::AuthenticationFailed {
            reason: err.to_string(),
        }
    }
}
