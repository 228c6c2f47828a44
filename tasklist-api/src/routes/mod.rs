/// API route handlers
///
/// - `health`: health check (public)
/// - `auth`: registration and login (public)
/// - `tasks`: task CRUD (bearer token required)

pub mod auth;
pub mod health;
pub mod tasks;
