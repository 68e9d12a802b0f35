/// Session token issuance and verification
///
/// Duet session tokens are JWTs signed with HS256 (HMAC-SHA256). The subject
/// claim is the username; the numeric user id is resolved separately by the
/// request gate so a token never embeds a database handle.
///
/// # Security
///
/// - **Algorithm**: HS256 only. Tokens presenting any other algorithm are
///   rejected before signature verification (algorithm-substitution defense).
/// - **Expiration**: always set; TTL is configurable (default 24 hours).
/// - **Validation**: signature, expiry, issuer, and audience checks.
/// - **Secret**: injected via [`TokenConfig`], at least 32 bytes. Rotating
///   the secret invalidates every outstanding token.
///
/// # Example
///
/// ```
/// use duet_shared::auth::jwt::{issue_token, verify_token, Claims, TokenConfig};
///
/// # fn example() -> Result<(), duet_shared::auth::jwt::TokenError> {
/// let config = TokenConfig {
///     secret: "a-signing-secret-of-at-least-32-bytes".to_string(),
///     audience: "https://api.helloduet.com".to_string(),
///     ttl_hours: 24,
/// };
///
/// let token = issue_token(&Claims::new("alice", &config), &config)?;
/// let claims = verify_token(&token, &config)?;
/// assert_eq!(claims.sub, "alice");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer claim stamped into every token
pub const ISSUER: &str = "duet";

/// Signing configuration for the token service
///
/// Built once from the environment and injected wherever tokens are issued
/// or verified. The secret is never hardcoded; rotation is a config change
/// plus a restart, and it invalidates all outstanding sessions.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Symmetric HMAC secret (at least 32 bytes)
    pub secret: String,

    /// Audience claim stamped into and required of every token
    pub audience: String,

    /// Session lifetime in hours
    pub ttl_hours: i64,
}

/// Error type for token operations
///
/// `Malformed`, `BadSignature`, `Expired`, and `WrongAlgorithm` classify
/// verification failures; `Issue` covers the (rare) encoding failure path.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Token could not be parsed, or its claims are not acceptable
    #[error("malformed token")]
    Malformed,

    /// Signature does not verify against the configured secret
    #[error("bad token signature")]
    BadSignature,

    /// Token expiry has passed
    #[error("token has expired")]
    Expired,

    /// Token was signed with an algorithm other than HS256
    #[error("unexpected signing algorithm")]
    WrongAlgorithm,

    /// Token could not be encoded
    #[error("failed to issue token: {0}")]
    Issue(String),
}

/// Signed token payload
///
/// Standard claims only: the subject is the username, and the numeric user
/// id is looked up by the request gate at verification time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - username of the session holder
    pub sub: String,

    /// Issuer - always [`ISSUER`]
    pub iss: String,

    /// Audience - the configured API audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for a username with the configured TTL
    pub fn new(username: &str, config: &TokenConfig) -> Self {
        Self::with_ttl(username, config, Duration::hours(config.ttl_hours))
    }

    /// Creates claims with an explicit TTL
    ///
    /// A negative TTL produces an already-expired token; tests use this to
    /// exercise the `Expired` verification path.
    pub fn with_ttl(username: &str, config: &TokenConfig, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: username.to_string(),
            iss: ISSUER.to_string(),
            aud: config.audience.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Checks whether the expiry has passed
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims into a compact token string
///
/// # Errors
///
/// Returns [`TokenError::Issue`] if encoding fails.
pub fn issue_token(claims: &Claims, config: &TokenConfig) -> Result<String, TokenError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(config.secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| TokenError::Issue(e.to_string()))
}

/// Verifies a token string and extracts its claims
///
/// Checks, in order enforced by the decoder:
/// - the header names HS256 (anything else is [`TokenError::WrongAlgorithm`])
/// - the signature verifies against the configured secret
/// - the token has not expired
/// - issuer and audience match this service
///
/// A token that fails issuer/audience checks, or that cannot be parsed at
/// all, comes back as [`TokenError::Malformed`] - the caller learns nothing
/// about which claim was wrong.
pub fn verify_token(token: &str, config: &TokenConfig) -> Result<Claims, TokenError> {
    let key = DecodingKey::from_secret(config.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_audience(&[&config.audience]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::WrongAlgorithm
            }
            _ => TokenError::Malformed,
        }
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            secret: "test-signing-secret-at-least-32-bytes-long".to_string(),
            audience: "https://api.helloduet.com".to_string(),
            ttl_hours: 24,
        }
    }

    #[test]
    fn test_claims_creation() {
        let config = test_config();
        let claims = Claims::new("alice", &config);

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, config.audience);
        assert!(!claims.is_expired());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let config = test_config();

        let token = issue_token(&Claims::new("alice", &config), &config).expect("issue");
        let claims = verify_token(&token, &config).expect("verify");

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, ISSUER);
    }

    #[test]
    fn test_verify_with_wrong_secret_is_bad_signature() {
        let config = test_config();
        let token = issue_token(&Claims::new("alice", &config), &config).expect("issue");

        let other = TokenConfig {
            secret: "a-completely-different-secret-of-32-bytes".to_string(),
            ..test_config()
        };

        let err = verify_token(&token, &other).unwrap_err();
        assert!(matches!(err, TokenError::BadSignature));
    }

    #[test]
    fn test_verify_expired_token() {
        let config = test_config();
        let claims = Claims::with_ttl("alice", &config, Duration::hours(-1));
        assert!(claims.is_expired());

        let token = issue_token(&claims, &config).expect("issue");
        let err = verify_token(&token, &config).unwrap_err();
        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn test_verify_rejects_other_hmac_algorithm() {
        let config = test_config();
        let claims = Claims::new("alice", &config);

        // Same secret, different algorithm: must be refused outright.
        let header = Header::new(Algorithm::HS384);
        let key = EncodingKey::from_secret(config.secret.as_bytes());
        let token = encode(&header, &claims, &key).expect("encode");

        let err = verify_token(&token, &config).unwrap_err();
        assert!(matches!(err, TokenError::WrongAlgorithm));
    }

    #[test]
    fn test_verify_rejects_unsigned_token() {
        let config = test_config();

        // Hand-built "alg":"none" token. Depending on where parsing gives up
        // this classifies as WrongAlgorithm or Malformed; it must never pass.
        let header = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0"; // {"alg":"none","typ":"JWT"}
        let token = format!("{header}.e30.");

        let err = verify_token(&token, &config).unwrap_err();
        assert!(matches!(
            err,
            TokenError::WrongAlgorithm | TokenError::Malformed
        ));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let config = test_config();

        for garbage in ["", "not-a-token", "a.b", "a.b.c.d"] {
            let err = verify_token(garbage, &config).unwrap_err();
            assert!(matches!(err, TokenError::Malformed), "input: {garbage:?}");
        }
    }

    #[test]
    fn test_verify_rejects_foreign_audience() {
        let config = test_config();
        let foreign = TokenConfig {
            audience: "https://api.example.com".to_string(),
            ..test_config()
        };

        let token = issue_token(&Claims::new("alice", &foreign), &foreign).expect("issue");
        let err = verify_token(&token, &config).unwrap_err();
        assert!(matches!(err, TokenError::Malformed));
    }
}
