//! # Token-Core - Room access tokens for RoomKit
//!
//! This crate mints the short-lived credentials a client presents to the
//! room service when it connects, and verifies them on the service side.
//!
//! A token is a compact HS256 JWT whose claim set binds a room id, a
//! connection id and the room specification (classification label,
//! capacity, bitrate reservation and topology):
//!
//! ```rust
//! use roomkit_token_core::{AccessTokenIssuer, TokenConfig};
//!
//! let issuer = AccessTokenIssuer::new(TokenConfig::new("shared-secret", "room-42")).unwrap();
//! let token = issuer.issue().unwrap();
//! assert!(token.claims().nbf < token.claims().exp);
//!
//! let claims = issuer.verify(token.as_str()).unwrap();
//! assert_eq!(claims.room_id, "room-42");
//! ```

pub mod config;
pub mod error;
pub mod issuer;
pub mod types;

pub use config::{TokenConfig, MAX_WINDOW_SECONDS};
pub use error::{Result, TokenError};
pub use issuer::{generate_connection_id, AccessToken, AccessTokenIssuer};
pub use types::{MediaControl, RoomSpec, RoomType, TokenClaims};
