/// User registration and login
///
/// Both endpoints are public and return the user plus a signed token:
///
/// ```json
/// {
///   "user": { "id": 1, "username": "alice", "email": "alice@example.com", "created_at": "..." },
///   "token": "eyJ...",
///   "expires_at": "..."
/// }
/// ```
///
/// # Endpoints
///
/// - `POST /api/v1/users/register` - Register a new user (201)
/// - `POST /api/v1/users/login` - Exchange credentials for a token (200)

use crate::{
    app::AppState,
    error::{ApiJson, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use tasklist_shared::auth::issuance::{IssuedIdentity, LoginRequest, RegisterRequest};

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/users/register
/// Content-Type: application/json
///
/// { "username": "alice", "email": "alice@example.com", "password": "correct horse" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: invalid body or validation failed
/// - `409 Conflict`: username or email already taken
/// - `500 Internal Server Error`: store or hashing failure
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<IssuedIdentity>)> {
    let issued = state.issuer.register(state.store.as_ref(), req).await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

/// Log in
///
/// # Errors
///
/// - `400 Bad Request`: invalid body
/// - `401 Unauthorized`: `Invalid credentials`, whichever factor was wrong
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<IssuedIdentity>> {
    let issued = state.issuer.login(state.store.as_ref(), req).await?;

    Ok(Json(issued))
}
