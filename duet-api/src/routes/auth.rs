/// Bootstrap endpoints: signup, login, verify
///
/// The only unauthenticated surface of the API. Signup and login exchange
/// credentials for a signed session token; verify lets a client check a
/// token it holds and see the decoded claims.
///
/// # Endpoints
///
/// - `POST /signup` - create an account, returns a token (409 on duplicate)
/// - `POST /login` - exchange username/password for a token
/// - `GET /verify` - echo the decoded claims of a presented token
///
/// Plaintext passwords exist only inside these handlers, on their way into
/// the hasher; they are never logged and never stored.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use duet_shared::auth::{
    jwt::{self, Claims},
    middleware::bearer_token,
    password,
};
use duet_shared::models::user::{CreateUser, User};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Desired username
    #[validate(length(min = 1, max = 64, message = "username must be 1-64 characters"))]
    pub username: String,

    /// Plaintext password, hashed before it goes anywhere
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username
    pub username: String,

    /// Plaintext password
    pub password: String,
}

/// Token response, shared by signup and login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed session token
    pub token: String,
}

/// Creates a new account and returns a session token
///
/// # Errors
///
/// - `422`: username/password fail validation
/// - `409`: username already taken
/// - `500`: hashing or store failure
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            password_hash,
        },
    )
    .await?;

    let token = jwt::issue_token(&Claims::new(&user.username, state.jwt()), state.jwt())?;

    tracing::info!(user_id = user.id, "user signed up");

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Exchanges credentials for a session token
///
/// An unknown username and a wrong password produce the same 401 with the
/// same message; nothing in the response or its timing says which it was.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = User::authenticate(&state.db, &req.username, &req.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid username or password".to_string()))?;

    let token = jwt::issue_token(&Claims::new(&user.username, state.jwt()), state.jwt())?;

    tracing::info!(user_id = user.id, "user logged in");

    Ok(Json(TokenResponse { token }))
}

/// Decodes and echoes the claims of a presented token
///
/// Lets a client self-check a stored token without touching any data. The
/// token is verified exactly as the request gate would, but the subject is
/// not resolved to a user - this endpoint answers "is this token valid",
/// not "who are you".
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Claims>> {
    let token = bearer_token(&headers)?;
    let claims = jwt::verify_token(token, state.jwt())?;

    Ok(Json(claims))
}
