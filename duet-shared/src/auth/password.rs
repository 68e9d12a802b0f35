/// Password hashing using Argon2id
///
/// Credentials are stored as Argon2id PHC strings, never as plaintext, and
/// plaintext passwords must never reach a log line. The parameters (64 MiB
/// memory, 3 passes, 4 lanes) put a single verification in the hundreds of
/// milliseconds on commodity hardware, which is the point: offline guessing
/// has to pay the same price.
///
/// # Example
///
/// ```
/// use duet_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse battery staple")?;
/// assert!(verify_password("correct horse battery staple", &hash)?);
/// assert!(!verify_password("tr0ub4dor&3", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash a password
    #[error("failed to hash password: {0}")]
    Hash(String),

    /// Stored hash is not a parseable PHC string
    #[error("invalid password hash: {0}")]
    InvalidHash(String),

    /// Verification failed for a reason other than a wrong password
    #[error("failed to verify password: {0}")]
    Verify(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    // m=64 MiB, t=3, p=4. Parameters are embedded in the PHC string, so they
    // can be raised later without invalidating stored hashes.
    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::Hash(format!("invalid parameters: {e}")))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a plaintext password with a fresh random salt
///
/// Returns the PHC string form (algorithm, parameters, salt, and digest),
/// which is what gets persisted in `users.password_hash`.
///
/// # Errors
///
/// Returns [`PasswordError::Hash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a plaintext password against a stored PHC string
///
/// A wrong password is `Ok(false)`, not an error; only an unparseable hash
/// or an internal failure produces `Err`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    // Parameters come from the stored hash, so a default instance suffices.
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = hash_password("a plaintext password").expect("hash");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("same password").expect("hash");
        let second = hash_password("same password").expect("hash");

        // Fresh salt per hash
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_roundtrip() {
        let hash = hash_password("pw1").expect("hash");

        assert!(verify_password("pw1", &hash).expect("verify"));
        assert!(!verify_password("pw2", &hash).expect("verify"));
        assert!(!verify_password("", &hash).expect("verify"));
    }

    #[test]
    fn test_verify_malformed_hash_is_error() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
        assert!(verify_password("pw", "$argon2id$garbage").is_err());
    }
}
