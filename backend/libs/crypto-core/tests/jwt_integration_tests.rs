/// Integration tests for crypto-core session tokens
///
/// This test module covers:
/// - Token issuance and validation through the public API
/// - Expiry boundaries with an explicit clock
/// - Identity resolution from verified claims
/// - Rejection of tokens signed with another secret
use chrono::{Duration, TimeZone, Utc};
use crypto_core::jwt::{TokenError, TokenService, DEFAULT_TOKEN_TTL_SECS};
use crypto_core::{hash_password, verify_password, Identity};
use uuid::Uuid;

const TEST_SECRET: &str = "integration-test-secret-with-enough-bytes";

fn tokens() -> TokenService {
    TokenService::new(TEST_SECRET, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
        .expect("Failed to build token service")
}

#[test]
fn test_login_token_resolves_to_identity() {
    let tokens = tokens();
    let user_id = Uuid::new_v4();

    let token = tokens
        .issue(user_id, "grace@example.com")
        .expect("Failed to issue token");
    let claims = tokens.verify(&token).expect("Token should verify");
    let identity = Identity::from_claims(&claims).expect("Subject should be a UUID");

    assert_eq!(identity, Identity::authenticated(user_id, "grace@example.com"));
}

#[test]
fn test_token_lifetime_boundaries() {
    let tokens = tokens();
    let issued_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let token = tokens
        .issue_at(Uuid::new_v4(), "grace@example.com", Duration::hours(1), issued_at)
        .unwrap();

    let claims = tokens
        .verify_at(&token, issued_at + Duration::minutes(59))
        .expect("Token should be valid before expiry");
    assert_eq!(claims.iat, issued_at.timestamp());

    let expired = tokens.verify_at(&token, issued_at + Duration::minutes(61));
    assert_eq!(expired, Err(TokenError::Expired));
}

#[test]
fn test_token_from_other_deployment_is_rejected() {
    let tokens = tokens();
    let other = TokenService::new(&"o".repeat(64), Duration::hours(1)).unwrap();

    let token = other.issue(Uuid::new_v4(), "mallory@example.com").unwrap();
    assert!(tokens.verify(&token).is_err());
}

#[test]
fn test_spliced_payload_is_rejected() {
    let tokens = tokens();
    let victim = tokens.issue(Uuid::new_v4(), "victim@example.com").unwrap();
    let attacker = tokens.issue(Uuid::new_v4(), "attacker@example.com").unwrap();

    let victim_parts: Vec<&str> = victim.split('.').collect();
    let attacker_parts: Vec<&str> = attacker.split('.').collect();
    let spliced = format!(
        "{}.{}.{}",
        attacker_parts[0], victim_parts[1], attacker_parts[2]
    );

    assert!(tokens.verify(&spliced).is_err());
}

#[test]
fn test_password_round_trip_for_minimum_length() {
    let hash = hash_password("abcde").expect("Failed to hash");
    assert!(verify_password("abcde", &hash).unwrap());
    assert!(!verify_password("abcdf", &hash).unwrap());
}
