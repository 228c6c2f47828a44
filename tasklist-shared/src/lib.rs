//! # Tasklist Shared Library
//!
//! Domain types, persistence and the authentication core used by the
//! Tasklist API server.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, tokens, the bearer gate, ownership checks,
//!   registration and login
//! - `models`: users and tasks with their SQL queries
//! - `store`: the store traits the auth core consumes, plus `PgStore`
//! - `db`: connection pool and migrations
//! - `testing`: in-memory store (`test-utils` feature)

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
