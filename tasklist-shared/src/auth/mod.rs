/// Authentication and authorization
///
/// Leaves first:
///
/// - [`password`]: Argon2id hashing and verification
/// - [`jwt`]: HS256 token issue and verify ([`jwt::TokenCodec`])
/// - [`middleware`]: bearer gate and the [`middleware::AuthContext`] extractor
/// - [`authorization`]: single-owner checks for tasks
/// - [`issuance`]: registration and login
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chrono::Duration;
/// use tasklist_shared::auth::{
///     issuance::{IdentityIssuer, LoginRequest},
///     jwt::{JwtSettings, TokenCodec},
///     password::HashingParams,
/// };
/// use tasklist_shared::store::Store;
///
/// # async fn example(store: Arc<dyn Store>) -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = Arc::new(TokenCodec::new(&JwtSettings::new(
///     std::env::var("JWT_SECRET")?,
///     Duration::minutes(15),
/// )));
/// let issuer = IdentityIssuer::new(tokens.clone(), HashingParams::default())?;
///
/// let issued = issuer
///     .login(store.as_ref(), LoginRequest {
///         email: "alice@example.com".to_string(),
///         password: "correct horse".to_string(),
///     })
///     .await?;
///
/// assert_eq!(tokens.verify(&issued.token.token)?, issued.user.id);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod issuance;
pub mod jwt;
pub mod middleware;
pub mod password;
