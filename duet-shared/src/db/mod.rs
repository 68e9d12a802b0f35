/// Database layer for Duet
///
/// The relational store is the only shared state in the system; each request
/// borrows a pooled connection and every CRUD operation is a single atomic
/// statement, so no coordination happens in-process.
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Migration runner over the workspace `migrations/` dir

pub mod migrations;
pub mod pool;
