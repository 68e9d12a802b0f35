/// Request gate: bearer-token authentication for the API router
///
/// Every request bound for an authenticated handler passes through
/// [`authenticate`]: the bearer token is pulled from the `Authorization`
/// header, verified by the token service, and its subject resolved to the
/// stable numeric user id via a username lookup. The resulting [`AuthUser`]
/// is what the router injects into request extensions; handlers never see a
/// request that failed any step, and no partial context is ever attached.
///
/// The verify + resolve sequence runs under a short deadline. On expiry the
/// request fails closed with [`AuthError::Timeout`], which maps to a status
/// distinct from the 401 auth failures.
///
/// # Example
///
/// ```no_run
/// use duet_shared::auth::jwt::TokenConfig;
/// use duet_shared::auth::middleware::authenticate;
/// use axum::http::HeaderMap;
/// use sqlx::PgPool;
/// use std::time::Duration;
///
/// # async fn example(pool: PgPool, config: TokenConfig, headers: HeaderMap) {
/// match authenticate(&pool, &config, Duration::from_millis(500), &headers).await {
///     Ok(user) => println!("authenticated as user {}", user.id),
///     Err(err) => println!("rejected: {err}"),
/// }
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;

use super::jwt::{self, TokenConfig, TokenError};
use crate::models::user::User;

/// Required scheme prefix of the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated identity injected into request extensions
///
/// Handlers extract this via `Extension<AuthUser>`; its presence means the
/// whole gate (token verification plus identity resolution) succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    /// Stable numeric user id, the handle every owner-scoped operation takes
    pub id: i64,

    /// Username carried as the token subject
    pub username: String,
}

/// Error type for the request gate
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header was presented
    #[error("missing bearer token")]
    MissingToken,

    /// Header present but not of the form `Bearer <token>`
    #[error("malformed authorization header")]
    MalformedHeader,

    /// Token verification failed
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Token verified but its subject is not a known user
    #[error("token subject is not a known user")]
    UnknownUser,

    /// Verify + resolve exceeded the gate deadline; the request fails closed
    #[error("authentication timed out")]
    Timeout,

    /// Identity lookup failed in the credential store
    #[error("credential lookup failed")]
    Database(#[source] sqlx::Error),
}

/// Extracts the bearer token from the `Authorization` header
///
/// The header must match the `Bearer ` prefix exactly; anything else is
/// [`AuthError::MalformedHeader`], an absent header [`AuthError::MissingToken`].
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)
}

/// Runs the full gate: extract, verify, resolve - under `deadline`
///
/// # Errors
///
/// - [`AuthError::MissingToken`] / [`AuthError::MalformedHeader`] before any
///   verification work happens
/// - [`AuthError::Token`] when the token does not verify
/// - [`AuthError::UnknownUser`] when the subject resolves to no user row
/// - [`AuthError::Timeout`] when `deadline` elapses mid-sequence
/// - [`AuthError::Database`] when the user lookup itself fails
pub async fn authenticate(
    pool: &PgPool,
    config: &TokenConfig,
    deadline: Duration,
    headers: &HeaderMap,
) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers)?;

    let verify_and_resolve = async {
        let claims = jwt::verify_token(token, config)?;

        let user = User::find_by_username(pool, &claims.sub)
            .await
            .map_err(AuthError::Database)?
            .ok_or(AuthError::UnknownUser)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    };

    match tokio::time::timeout(deadline, verify_and_resolve).await {
        Ok(result) => result,
        Err(_elapsed) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "request gate deadline exceeded");
            Err(AuthError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let err = bearer_token(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let headers = headers_with_authorization("Basic YWxpY2U6cHcx");
        let err = bearer_token(&headers).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader));
    }

    #[test]
    fn test_bearer_token_prefix_is_case_sensitive() {
        let headers = headers_with_authorization("bearer abc.def.ghi");
        let err = bearer_token(&headers).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader));
    }

    #[test]
    fn test_bearer_token_missing_space() {
        let headers = headers_with_authorization("Bearer");
        let err = bearer_token(&headers).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader));
    }

    #[test]
    fn test_bearer_token_extracts_token() {
        let headers = headers_with_authorization("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
