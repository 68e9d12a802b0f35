/// Authentication primitives for Duet
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Session token issuance and verification
/// - [`middleware`]: Bearer-token request gate shared by the API router
///
/// A session token is issued at login/signup, carries the username as its
/// subject, and is verified on every authenticated request. There is no
/// revocation list: rotating the signing secret invalidates every
/// outstanding token at once.

pub mod jwt;
pub mod middleware;
pub mod password;
