/// User model and credential store
///
/// Users are created once at signup and never mutated afterwards; the
/// `deleted_at` column exists for soft deletion but no delete path is
/// exposed. Passwords are stored as Argon2id PHC strings.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::LazyLock;

use crate::auth::password::{hash_password, verify_password, PasswordError};

/// Error type for credential verification
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Underlying store failure
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Hashing/verification failure (not a wrong password)
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// User account
///
/// The id is the stable numeric handle every owner-scoped operation takes.
/// The password hash never serializes into a response.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Stable numeric user id
    pub id: i64,

    /// Unique username, also the token subject
    pub username: String,

    /// Argon2id PHC string, never plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker; no delete path sets this today
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
///
/// The hash is produced by the signup handler; plaintext never reaches the
/// store.
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Unique username
    pub username: String,

    /// Argon2id PHC string
    pub password_hash: String,
}

// Verified against when a login names an unknown user, so that the missing
// row is not observable as a faster response.
static FALLBACK_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("duet-fallback-credential").expect("hashing a constant input"));

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// A `username` unique-constraint violation surfaces as a database error
    /// the API layer maps to a 409 conflict; everything else is opaque store
    /// failure.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at, updated_at, deleted_at
            "#,
        )
        .bind(data.username)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by id
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact username
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at, updated_at, deleted_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Verifies a username/password pair
    ///
    /// Returns `Ok(None)` both for an unknown username and for a wrong
    /// password - the two cases are indistinguishable to the caller, and an
    /// unknown username still pays the cost of one hash verification so the
    /// difference does not show up as timing either.
    ///
    /// # Errors
    ///
    /// Only store failures and hash-corruption errors; a failed match is not
    /// an error.
    pub async fn authenticate(
        pool: &PgPool,
        username: &str,
        password: &str,
    ) -> Result<Option<Self>, CredentialError> {
        match Self::find_by_username(pool, username).await? {
            Some(user) => {
                if verify_password(password, &user.password_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => {
                let _ = verify_password(password, &FALLBACK_HASH);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_never_serializes() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"username\":\"alice\""));
    }

    #[test]
    fn test_fallback_hash_is_valid_phc() {
        assert!(FALLBACK_HASH.starts_with("$argon2id$"));
        assert!(!verify_password("some wrong guess", &FALLBACK_HASH).expect("verify"));
    }
}
