//! Access token issuance and verification

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use tracing::{debug, warn};

use crate::config::TokenConfig;
use crate::types::TokenClaims;
use crate::{Result, TokenError};

/// A signed, compact (`header.payload.signature`) access token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    claims: TokenClaims,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn into_string(self) -> String {
        self.token
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Structural check: three non-empty base64url segments.
    ///
    /// Does not check the signature; see [`AccessTokenIssuer::verify`].
    pub fn is_well_formed(token: &str) -> bool {
        let parts: Vec<&str> = token.split('.').collect();
        parts.len() == 3
            && parts
                .iter()
                .all(|part| !part.is_empty() && URL_SAFE_NO_PAD.decode(part).is_ok())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("connection_id", &self.claims.connection_id)
            .field("room_id", &self.claims.room_id)
            .field("nbf", &self.claims.nbf)
            .field("exp", &self.claims.exp)
            .finish()
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Mints and verifies HS256 room access tokens
pub struct AccessTokenIssuer {
    config: TokenConfig,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    header: Header,
}

impl AccessTokenIssuer {
    pub fn new(config: TokenConfig) -> Result<Self> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(config.client_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.client_secret.as_bytes());

        let mut header = Header::new(Algorithm::HS256);
        header.cty = Some("JWT".to_string());

        Ok(Self {
            config,
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            header,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mint a token valid around the current time
    pub fn issue(&self) -> Result<AccessToken> {
        self.issue_at(chrono::Utc::now().timestamp())
    }

    /// Mint a token valid around `now` (unix seconds)
    pub fn issue_at(&self, now: i64) -> Result<AccessToken> {
        let nbf = now
            .checked_sub(self.config.not_before_skew_seconds)
            .ok_or_else(|| TokenError::Signing(format!("nbf out of range for now = {}", now)))?;
        let exp = now
            .checked_add(self.config.ttl_seconds)
            .ok_or_else(|| TokenError::Signing(format!("exp out of range for now = {}", now)))?;

        let claims = TokenClaims {
            nbf,
            exp,
            room_id: self.config.room_id.clone(),
            room_spec: self.config.room_spec.clone(),
            connection_id: generate_connection_id(&self.config.connection_id_prefix),
        };

        self.sign(claims)
    }

    /// Sign an explicit claim set
    pub fn sign(&self, claims: TokenClaims) -> Result<AccessToken> {
        if claims.nbf >= claims.exp {
            return Err(TokenError::Signing(format!(
                "nbf ({}) must be earlier than exp ({})",
                claims.nbf, claims.exp
            )));
        }

        let token = encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!(
            "Issued access token for room {} (connection_id: {}, exp: {})",
            claims.room_id, claims.connection_id, claims.exp
        );

        Ok(AccessToken { token, claims })
    }

    /// Verify signature and validity window against the current time
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify signature and validity window against `now` (unix seconds)
    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims> {
        let mut validation = Validation::new(self.header.alg);
        // The window is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                warn!("Access token rejected: {}", e);
                TokenError::from(e)
            })?;

        let claims = token_data.claims;
        if now < claims.nbf {
            return Err(TokenError::TokenNotYetValid);
        }
        if now > claims.exp {
            return Err(TokenError::TokenExpired);
        }

        Ok(claims)
    }
}

/// Build a connection id: `prefix` followed by random base64 characters
/// with `=`, `+`, `/` and newlines removed.
pub fn generate_connection_id(prefix: &str) -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);

    let encoded: String = STANDARD
        .encode(bytes)
        .chars()
        .filter(|c| !matches!(c, '=' | '+' | '/' | '\n'))
        .collect();

    format!("{}{}", prefix, encoded)
}
