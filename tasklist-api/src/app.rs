/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasklist_api::{app::{build_router, AppState}, config::Config};
/// use tasklist_shared::{auth::password::HashingParams, db::pool::create_pool, store::PgStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(&config.database).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config, HashingParams::default())?;
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::{any::Any, sync::Arc, time::Duration};
use tasklist_shared::{
    auth::{
        issuance::IdentityIssuer,
        jwt::TokenCodec,
        middleware::require_bearer,
        password::{HashingParams, PasswordError},
    },
    store::Store,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor; everything inside is
/// behind an `Arc` and immutable.
#[derive(Clone)]
pub struct AppState {
    /// Credential and task persistence
    pub store: Arc<dyn Store>,

    /// Token issue and verify
    pub tokens: Arc<TokenCodec>,

    /// Registration and login
    pub issuer: Arc<IdentityIssuer>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the token codec and issuer from `config`
    ///
    /// # Errors
    ///
    /// Fails if `params` can't produce the issuer's decoy hash.
    pub fn new(
        store: Arc<dyn Store>,
        config: Config,
        params: HashingParams,
    ) -> Result<Self, PasswordError> {
        let tokens = Arc::new(TokenCodec::new(&config.jwt));
        let issuer = Arc::new(IdentityIssuer::new(tokens.clone(), params)?);

        Ok(Self {
            store,
            tokens,
            issuer,
            config: Arc::new(config),
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                      # public
/// └── /api/v1/
///     ├── POST /users/register         # public
///     ├── POST /users/login            # public
///     ├── POST /tasks                  # bearer
///     ├── GET  /tasks                  # bearer
///     ├── GET    /tasks/:id            # bearer + owner
///     ├── PATCH  /tasks/:id            # bearer + owner
///     └── DELETE /tasks/:id            # bearer + owner
/// ```
///
/// Outermost first: request id, tracing, request id propagation, panic
/// recovery, timeout, CORS, security headers.
pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/users/register", post(routes::auth::register))
        .route("/users/login", post(routes::auth::login));

    // route_layer keeps unknown paths as 404 instead of 401
    let task_routes = Router::new()
        .route(
            "/tasks",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route_layer(from_fn_with_state(state.tokens.clone(), require_bearer));

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(state.config.api.request_timeout))
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", user_routes.merge(task_routes))
        .layer(middleware)
        .with_state(state)
}

/// Permissive for `*`, otherwise the listed origins only
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::InternalError(format!("Handler panicked: {}", detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_origins_parse() {
        // Smoke test: both branches build without panicking
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["https://app.example".to_string(), "not a header\n".to_string()]);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "An internal error occurred");
    }
}
