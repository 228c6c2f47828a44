/// Database models for Tasklist
///
/// This module contains the persisted records and their SQL operations.
///
/// # Models
///
/// - `user`: User accounts and credentials
/// - `task`: Tasks owned by users
///
/// Handlers don't call these directly; they go through the store traits in
/// [`crate::store`], whose PostgreSQL implementation delegates here.

pub mod task;
pub mod user;
