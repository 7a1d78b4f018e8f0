/// Session token signing and validation for Quill services
///
/// Tokens are HS256-signed JWTs carrying the user id (`sub`) and email.
/// The signing secret is handed to [`TokenService::new`] by the caller, so
/// each service (and each test) owns its key material instead of sharing a
/// process-wide static.
///
/// ## Usage
///
/// ```rust
/// use chrono::Duration;
/// use crypto_core::jwt::TokenService;
/// use uuid::Uuid;
///
/// let tokens = TokenService::new(&"s".repeat(32), Duration::hours(1)).unwrap();
/// let user_id = Uuid::new_v4();
/// let token = tokens.issue(user_id, "ada@example.com").unwrap();
/// let claims = tokens.verify(&token).unwrap();
/// assert_eq!(claims.user_id().unwrap(), user_id);
/// ```
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Lifetime of a session token issued at login.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// HMAC secrets shorter than this are rejected at construction.
pub const MIN_SECRET_BYTES: usize = 32;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Email address at the time of login
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Parse the subject into a user id.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret too short: {0} bytes, at least {MIN_SECRET_BYTES} required")]
    WeakSecret(usize),

    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

// ============================================================================
// Token Service
// ============================================================================

/// Issues and verifies session tokens with an injected HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

impl TokenService {
    /// Build a token service from a shared secret.
    ///
    /// ## Errors
    ///
    /// Returns `TokenError::WeakSecret` when the secret is shorter than
    /// [`MIN_SECRET_BYTES`].
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret(secret.len()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Default lifetime applied by [`TokenService::issue`].
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id` that expires after the configured ttl.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, self.ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, structure and expiry of a token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against an explicit clock.
    ///
    /// Expiry is exact: a token is rejected once `now` is past `exp`, with no
    /// leeway.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        // exp is compared against `now` below
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(map_decode_error)?
            .claims;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        claims.user_id()?;

        Ok(claims)
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&"k".repeat(32), Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
            .expect("32-byte secret is accepted")
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = service();
        let user_id = Uuid::new_v4();

        let token = tokens.issue(user_id, "ada@example.com").unwrap();
        assert_eq!(token.matches('.').count(), 2);

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_expiry_is_exact() {
        let tokens = service();
        let issued_at = Utc::now();
        let token = tokens
            .issue_at(Uuid::new_v4(), "ada@example.com", Duration::hours(1), issued_at)
            .unwrap();

        assert!(tokens
            .verify_at(&token, issued_at + Duration::minutes(59))
            .is_ok());
        assert!(tokens.verify_at(&token, issued_at + Duration::hours(1)).is_ok());
        assert_eq!(
            tokens.verify_at(&token, issued_at + Duration::minutes(61)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_rejects_weak_secret() {
        let result = TokenService::new(&"k".repeat(31), Duration::hours(1));
        assert!(matches!(result, Err(TokenError::WeakSecret(31))));
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let ours = service();
        let theirs = TokenService::new(&"x".repeat(40), Duration::hours(1)).unwrap();

        let token = theirs.issue(Uuid::new_v4(), "eve@example.com").unwrap();
        assert_eq!(ours.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_rejects_garbage() {
        let tokens = service();
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Malformed));
        assert!(tokens.verify("").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("kkkk"));
    }
}
