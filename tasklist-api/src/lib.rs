//! # Tasklist API Server Library
//!
//! HTTP surface for the task list service: identity issuance, the bearer
//! gate, and owner-scoped task CRUD.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response middleware
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
