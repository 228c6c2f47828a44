/// Bearer-token gate for Axum
///
/// [`require_bearer`] runs before every task handler. It pulls the token out of
/// the `Authorization` header, verifies it with the shared [`TokenCodec`], and
/// stores the resulting [`AuthContext`] in the request extensions. Handlers take
/// `AuthContext` as an ordinary extractor argument.
///
/// | Request | Outcome |
/// |---------|---------|
/// | no `Authorization` header | 401 `Authorization header is required` |
/// | not `Bearer <token>` | 401 `Invalid Authorization header format` |
/// | token fails verification | 401 `Invalid token` |
/// | token valid | handler runs with `AuthContext` |
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use chrono::Duration;
/// use tasklist_shared::auth::jwt::{JwtSettings, TokenCodec};
/// use tasklist_shared::auth::middleware::{require_bearer, AuthContext};
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("user {}", auth.user_id)
/// }
///
/// let codec = Arc::new(TokenCodec::new(&JwtSettings::new(
///     "a-secret-that-is-at-least-32-bytes!!",
///     Duration::minutes(15),
/// )));
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn_with_state(codec, require_bearer));
/// ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use super::jwt::TokenCodec;

/// Verified caller identity for the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Subject of the verified token
    pub user_id: i64,
}

impl AuthContext {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Why the gate turned a request away
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("Invalid Authorization header format")]
    InvalidFormat,

    /// Bad signature, expired, wrong algorithm, wrong issuer or bad claims.
    /// Callers are never told which.
    #[error("Invalid token")]
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "unauthorized",
            "message": self.to_string(),
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` header
///
/// The header must split on single spaces into exactly two parts, the first
/// being `Bearer`. An empty header counts as missing.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidFormat)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        _ => Err(AuthError::InvalidFormat),
    }
}

/// Gate middleware; use with `axum::middleware::from_fn_with_state`
pub async fn require_bearer(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).map_err(|e| {
        debug!(reason = %e, "Rejected request at auth gate");
        e
    })?;

    let user_id = codec.verify(token).map_err(|e| {
        debug!(error = %e, "Token verification failed");
        AuthError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthContext::new(user_id));

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    /// Reads the identity the gate attached. A handler mounted without the
    /// gate never sees an identity, so this rejects with 401.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtSettings;
    use axum::{body::Body, http::HeaderValue, middleware, routing::get, Router};
    use chrono::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(&JwtSettings::new(
            SECRET,
            Duration::minutes(5),
        )))
    }

    async fn whoami(auth: AuthContext) -> String {
        auth.user_id.to_string()
    }

    fn gated_app(codec: Arc<TokenCodec>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(codec, require_bearer))
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, serde_json::Value, String) {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

        (status, json, text)
    }

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers_with("Bearer ")), Ok(""));

        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
        assert_eq!(bearer_token(&headers_with("")), Err(AuthError::MissingHeader));

        for bad in [
            "Bearer",
            "bearer abc",
            "Basic abc",
            "Bearer a b",
            "Bearer  abc",
            "Token abc",
        ] {
            assert_eq!(
                bearer_token(&headers_with(bad)),
                Err(AuthError::InvalidFormat),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let codec = codec();
        let token = codec.issue(42).unwrap().token;

        let (status, _, body) = call(gated_app(codec), Some(format!("Bearer {}", token).as_str())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "42");
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let (status, json, _) = call(gated_app(codec()), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "unauthorized");
        assert_eq!(json["message"], "Authorization header is required");
    }

    #[tokio::test]
    async fn test_malformed_header_rejected() {
        let (status, json, _) = call(gated_app(codec()), Some("Token abc")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Invalid Authorization header format");
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (status, json, _) = call(gated_app(codec()), Some("Bearer garbage")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Invalid token");
    }

    #[tokio::test]
    async fn test_expired_and_foreign_tokens_look_the_same() {
        let codec = codec();
        let expired = codec.issue_with_ttl(1, Duration::seconds(-1)).unwrap().token;

        let other = TokenCodec::new(&JwtSettings::new(
            "a-completely-different-secret-0123456789",
            Duration::minutes(5),
        ));
        let foreign = other.issue(1).unwrap().token;

        let (s1, _, expired_body) =
            call(gated_app(codec.clone()), Some(format!("Bearer {}", expired).as_str())).await;
        let (s2, _, foreign_body) =
            call(gated_app(codec), Some(format!("Bearer {}", foreign).as_str())).await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s2, StatusCode::UNAUTHORIZED);
        assert_eq!(expired_body, foreign_body);
    }

    #[tokio::test]
    async fn test_extractor_without_gate_rejects() {
        let app = Router::new().route("/whoami", get(whoami));

        let (status, json, _) = call(app, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "unauthorized");
    }
}
