//! Error types for token operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::TokenExpired,
            ErrorKind::ImmatureSignature => TokenError::TokenNotYetValid,
            _ => TokenError::InvalidToken(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;
