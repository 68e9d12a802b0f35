/// Database models for Duet
///
/// This module contains the models and their owner-scoped CRUD operations.
/// Every task/action operation is parameterized by the authenticated user's
/// id; there is no code path that reads or mutates another user's rows.
///
/// # Models
///
/// - `user`: Accounts and credential verification
/// - `task`: One-off tasks and recurring habits, owned by a user
/// - `action`: Progress/defer/done events on a task, owned transitively

pub mod action;
pub mod task;
pub mod user;
