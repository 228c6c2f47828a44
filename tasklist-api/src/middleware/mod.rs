/// Middleware modules for the API server
///
/// Authentication lives in `tasklist_shared::auth::middleware`; this module
/// holds the HTTP-only layers.

pub mod security;
