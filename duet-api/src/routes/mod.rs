/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Bootstrap endpoints (signup, login, verify)
/// - `tasks`: Owner-scoped task and action endpoints

pub mod auth;
pub mod health;
pub mod tasks;
