//! Configuration for token issuance

use std::fmt;

use serde::Deserialize;

use crate::types::RoomSpec;
use crate::{Result, TokenError};

/// Upper bound for `ttl_seconds` and `not_before_skew_seconds` (one year)
pub const MAX_WINDOW_SECONDS: i64 = 366 * 24 * 60 * 60;

/// Token issuer configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared secret used for HS256 signing
    pub client_secret: String,
    pub room_id: String,
    pub room_spec: RoomSpec,
    /// How far before "now" the token becomes valid
    pub not_before_skew_seconds: i64,
    /// How long after "now" the token stays valid
    pub ttl_seconds: i64,
    /// Prefix of generated connection ids
    pub connection_id_prefix: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            client_secret: String::new(),
            room_id: String::new(),
            room_spec: RoomSpec::default(),
            not_before_skew_seconds: 30 * 60,  // 30 minutes
            ttl_seconds: 30 * 60,              // 30 minutes
            connection_id_prefix: "RoomKitSample".to_string(),
        }
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("client_secret", &"<redacted>")
            .field("room_id", &self.room_id)
            .field("room_spec", &self.room_spec)
            .field("not_before_skew_seconds", &self.not_before_skew_seconds)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("connection_id_prefix", &self.connection_id_prefix)
            .finish()
    }
}

impl TokenConfig {
    pub fn new(client_secret: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            client_secret: client_secret.into(),
            room_id: room_id.into(),
            ..Default::default()
        }
    }

    pub fn with_room_spec(mut self, room_spec: RoomSpec) -> Self {
        self.room_spec = room_spec;
        self
    }

    pub fn with_ttl_seconds(mut self, ttl_seconds: i64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_not_before_skew_seconds(mut self, skew: i64) -> Self {
        self.not_before_skew_seconds = skew;
        self
    }

    pub fn with_connection_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.connection_id_prefix = prefix.into();
        self
    }

    /// Check the configuration before any token is minted
    pub fn validate(&self) -> Result<()> {
        if self.client_secret.is_empty() {
            return Err(TokenError::Config("client_secret must not be empty".to_string()));
        }
        if self.room_id.is_empty() {
            return Err(TokenError::Config("room_id must not be empty".to_string()));
        }
        if self.not_before_skew_seconds < 0 {
            return Err(TokenError::Config("not_before_skew_seconds must not be negative".to_string()));
        }
        if self.not_before_skew_seconds > MAX_WINDOW_SECONDS {
            return Err(TokenError::Config(format!(
                "not_before_skew_seconds must not exceed {}",
                MAX_WINDOW_SECONDS
            )));
        }
        if self.ttl_seconds <= 0 {
            return Err(TokenError::Config("ttl_seconds must be positive".to_string()));
        }
        if self.ttl_seconds > MAX_WINDOW_SECONDS {
            return Err(TokenError::Config(format!("ttl_seconds must not exceed {}", MAX_WINDOW_SECONDS)));
        }
        if self.room_spec.max_connections == 0 {
            return Err(TokenError::Config("room_spec.max_connections must be positive".to_string()));
        }
        Ok(())
    }
}
