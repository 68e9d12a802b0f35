/// Middleware modules for the API server
///
/// The request gate itself lives in `duet_shared::auth::middleware` and is
/// wired up in `app.rs`; this module holds the HTTP-hygiene middleware.

pub mod security;
