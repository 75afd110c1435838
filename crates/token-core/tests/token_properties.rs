//! Property tests for issued access tokens

use proptest::prelude::*;
use roomkit_token_core::{AccessToken, AccessTokenIssuer, TokenConfig, TokenError};

proptest! {
    #[test]
    fn issued_tokens_verify_inside_their_window(
        now in 1_000_000_000i64..2_000_000_000i64,
        skew in 0i64..7200,
        ttl in 1i64..7200,
        secret in "[a-zA-Z0-9]{8,32}",
    ) {
        let config = TokenConfig::new(secret, "room-prop")
            .with_not_before_skew_seconds(skew)
            .with_ttl_seconds(ttl);
        let issuer = AccessTokenIssuer::new(config).unwrap();
        let token = issuer.issue_at(now).unwrap();

        prop_assert!(token.claims().nbf < token.claims().exp);
        prop_assert!(AccessToken::is_well_formed(token.as_str()));

        let claims = issuer.verify_at(token.as_str(), now).unwrap();
        prop_assert_eq!(&claims, token.claims());
    }

    #[test]
    fn tokens_fail_with_a_different_secret(
        secret in "[a-z]{8,16}",
        other in "[A-Z]{8,16}",
    ) {
        let issuer = AccessTokenIssuer::new(TokenConfig::new(secret, "room-prop")).unwrap();
        let verifier = AccessTokenIssuer::new(TokenConfig::new(other, "room-prop")).unwrap();
        let token = issuer.issue().unwrap();

        let is_invalid = matches!(verifier.verify(token.as_str()), Err(TokenError::InvalidToken(_)));
        prop_assert!(is_invalid);
    }
}

#[test]
fn test_empty_secret_is_a_configuration_error() {
    let result = AccessTokenIssuer::new(TokenConfig::new("", "room"));
    assert!(matches!(result, Err(TokenError::Config(_))));
}

#[test]
fn test_tampered_payload_is_rejected() {
    let issuer = AccessTokenIssuer::new(TokenConfig::new("secret", "room")).unwrap();
    let token = issuer.issue().unwrap();

    let other = issuer.issue().unwrap();
    let mut parts: Vec<&str> = token.as_str().split('.').collect();
    let other_parts: Vec<&str> = other.as_str().split('.').collect();
    parts[1] = other_parts[1];
    let tampered = parts.join(".");

    assert!(matches!(issuer.verify(&tampered), Err(TokenError::InvalidToken(_))));
}
