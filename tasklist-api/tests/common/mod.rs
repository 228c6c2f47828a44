//! Common test utilities for integration tests
//!
//! Each [`TestContext`] owns a fresh router over an in-memory store, so tests
//! are independent and need no database. Requests go through the full
//! middleware stack with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tasklist_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, LogFormat},
};
use tasklist_shared::{
    auth::{
        jwt::{JwtSettings, TokenCodec},
        password::HashingParams,
    },
    db::pool::DatabaseConfig,
    testing::MemoryStore,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Test context containing the app and the store behind it
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub tokens: Arc<TokenCodec>,
}

/// A fully buffered response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Response body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }
}

/// A registered user and their token
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig::default(),
        database: DatabaseConfig {
            url: "postgresql://unused/tasklist_test".to_string(),
            ..DatabaseConfig::default()
        },
        jwt: JwtSettings::new(TEST_SECRET, chrono::Duration::minutes(15)),
        log_format: LogFormat::Pretty,
    }
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), test_config(), HashingParams::insecure_fast())
            .expect("Failed to build app state");
        let tokens = state.tokens.clone();

        Self {
            app: build_router(state),
            store,
            tokens,
        }
    }

    /// Sends a request with an optional `Authorization` header value and JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send_request(builder.body(body).unwrap()).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register_raw(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/api/v1/users/register",
            None,
            Some(json!({ "username": username, "email": email, "password": password })),
        )
        .await
    }

    pub async fn login_raw(&self, email: &str, password: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Registers `username` with `<username>@example.com` and [`TEST_PASSWORD`]
    pub async fn register(&self, username: &str) -> TestUser {
        let response = self
            .register_raw(username, &format!("{}@example.com", username), TEST_PASSWORD)
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        let json = response.json();
        TestUser {
            id: json["user"]["id"].as_i64().expect("user id"),
            token: json["token"].as_str().expect("token").to_string(),
        }
    }

    /// Creates a task due a day from now and returns its id
    pub async fn create_task(&self, user: &TestUser, name: &str) -> i64 {
        let response = self
            .send(
                Method::POST,
                "/api/v1/tasks",
                Some(&user.auth_header()),
                Some(json!({
                    "name": name,
                    "description": format!("{} description", name),
                    "deadline": future_deadline(),
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        response.json()["id"].as_i64().expect("task id")
    }
}

/// RFC 3339 timestamp a day in the future
pub fn future_deadline() -> String {
    (chrono::Utc::now() + chrono::Duration::days(1)).to_rfc3339()
}

/// RFC 3339 timestamp a day in the past
pub fn past_deadline() -> String {
    (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339()
}
