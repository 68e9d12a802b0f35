/// Error handling for the API server
///
/// One unified error type that maps onto HTTP responses. Handlers return
/// `ApiResult<T>`; every failure of the auth stack or the store converts
/// into an `ApiError` via the `From` impls below, so the taxonomy lives in
/// one place:
///
/// - auth failures (missing/malformed/bad/expired tokens, bad credentials)
///   are 401 and terminal at the request gate
/// - the gate deadline maps to 503, deliberately distinct from 401
/// - a merged "not found or not owned" is one uniform 404 - existence is
///   never revealed to non-owners
/// - duplicate username is a structured 409
/// - store failures are opaque 500s; details go to the log, not the client

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use duet_shared::auth::{jwt::TokenError, middleware::AuthError, password::PasswordError};
use duet_shared::models::user::CredentialError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Not found - or not owned; the caller cannot tell (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate username
    Conflict(String),

    /// Unprocessable entity (422) - request payload validation
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503), e.g. the gate deadline expired
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "unauthorized", "conflict")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            ApiError::NotFound(msg) => write!(f, "not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "conflict: {msg}"),
            ApiError::ValidationError(errors) => {
                write!(f, "validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "internal error: {msg}"),
            ApiError::ServiceUnavailable(msg) => write!(f, "service unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log the detail, return a generic message
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert store errors to API errors
///
/// A unique violation on `users.username` is the one store error with a
/// structured meaning (409); everything else is opaque.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("username") {
                        return ApiError::Conflict("username already taken".to_string());
                    }
                    return ApiError::Conflict(format!("constraint violation: {constraint}"));
                }
                ApiError::InternalError(format!("database error: {db_err}"))
            }
            _ => ApiError::InternalError(format!("database error: {err}")),
        }
    }
}

/// Convert token verification errors to API errors
impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::Unauthorized("token has expired".to_string()),
            TokenError::WrongAlgorithm => {
                ApiError::Unauthorized("unexpected signing algorithm".to_string())
            }
            TokenError::BadSignature => ApiError::Unauthorized("invalid token".to_string()),
            TokenError::Malformed => ApiError::Unauthorized("malformed token".to_string()),
            TokenError::Issue(msg) => ApiError::InternalError(format!("token issuance failed: {msg}")),
        }
    }
}

/// Convert request-gate errors to API errors
///
/// Everything is a 401 except the deadline (503, fails closed but is not an
/// auth verdict) and a store failure inside the lookup (500).
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized("missing bearer token".to_string()),
            AuthError::MalformedHeader => {
                ApiError::Unauthorized("malformed authorization header".to_string())
            }
            AuthError::Token(token_err) => token_err.into(),
            AuthError::UnknownUser => ApiError::Unauthorized("invalid token".to_string()),
            AuthError::Timeout => {
                ApiError::ServiceUnavailable("authentication timed out".to_string())
            }
            AuthError::Database(e) => ApiError::InternalError(format!("credential lookup failed: {e}")),
        }
    }
}

/// Convert password hashing errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("password operation failed: {err}"))
    }
}

/// Convert credential verification errors to API errors
impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Database(e) => e.into(),
            CredentialError::Password(e) => e.into(),
        }
    }
}

/// Convert payload validation errors to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Unauthorized("missing bearer token".to_string());
        assert_eq!(err.to_string(), "unauthorized: missing bearer token");

        let err = ApiError::NotFound("task not found".to_string());
        assert_eq!(err.to_string(), "not found: task not found");
    }

    #[test]
    fn test_token_errors_map_to_unauthorized() {
        for token_err in [
            TokenError::Malformed,
            TokenError::BadSignature,
            TokenError::Expired,
            TokenError::WrongAlgorithm,
        ] {
            let api_err: ApiError = token_err.into();
            assert!(
                matches!(api_err, ApiError::Unauthorized(_)),
                "expected 401 mapping, got {api_err:?}"
            );
        }
    }

    #[test]
    fn test_gate_timeout_is_not_a_401() {
        let api_err: ApiError = AuthError::Timeout.into();
        assert!(matches!(api_err, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_unknown_user_does_not_leak() {
        let api_err: ApiError = AuthError::UnknownUser.into();
        match api_err {
            ApiError::Unauthorized(msg) => assert_eq!(msg, "invalid token"),
            other => panic!("expected 401, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_display() {
        let err = ApiError::ValidationError(vec![
            ValidationErrorDetail {
                field: "username".to_string(),
                message: "must not be empty".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "too short".to_string(),
            },
        ]);
        assert_eq!(err.to_string(), "validation failed: 2 errors");
    }
}
