/// Registration and login
///
/// [`IdentityIssuer`] turns credentials into a signed token:
///
/// ```text
/// register: validate ─▶ hash ─▶ store.create_user ─▶ issue token
/// login:    validate ─▶ store.find_user_by_email ─▶ verify hash ─▶ issue token
/// ```
///
/// Login never says which factor failed. An unknown email and a wrong password
/// both come back as [`IssuanceError::InvalidCredentials`], and an unknown email
/// still pays for one Argon2 verification against a decoy hash so the two cases
/// take about the same time.
///
/// Argon2 work runs on the blocking pool.

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use super::{
    jwt::{IssuedToken, TokenCodec},
    password::{self, HashingParams, PasswordError},
};
use crate::{
    models::user::{
        CreateUser, UserProfile, MAX_EMAIL_LENGTH, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH,
    },
    store::{CredentialStore, StoreError},
};

/// Registration payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = MIN_USERNAME_LENGTH,
        max = MAX_USERNAME_LENGTH,
        message = "Username must be 3-20 characters"
    ))]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = MAX_EMAIL_LENGTH, message = "Email must be at most 100 characters")
    )]
    pub email: String,

    /// Checked against the password policy after the derived rules pass
    pub password: String,
}

/// Login payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// A user together with a fresh token for them
#[derive(Debug, Clone, Serialize)]
pub struct IssuedIdentity {
    pub user: UserProfile,

    /// Serialized inline as `token` and `expires_at`
    #[serde(flatten)]
    pub token: IssuedToken,
}

/// Error type for registration and login
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    /// Input failed shape or policy checks
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Username or email already taken
    #[error("{0} already exists")]
    Conflict(String),

    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Store, hashing or signing failure; detail is for logs only
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for IssuanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => IssuanceError::Conflict(field),
            other => IssuanceError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for IssuanceError {
    fn from(err: PasswordError) -> Self {
        IssuanceError::Internal(err.to_string())
    }
}

/// Lowercases and trims an email so lookups match what registration stored
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers users and logs them in
pub struct IdentityIssuer {
    tokens: Arc<TokenCodec>,
    params: HashingParams,
    decoy_hash: String,
}

impl IdentityIssuer {
    /// Builds an issuer and precomputes the decoy hash with `params`
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if `params` are unusable.
    pub fn new(tokens: Arc<TokenCodec>, params: HashingParams) -> Result<Self, PasswordError> {
        let decoy_hash = password::hash_password_with("decoy-password-never-matches", &params)?;

        Ok(Self {
            tokens,
            params,
            decoy_hash,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    /// Creates an account and issues its first token
    pub async fn register<S>(
        &self,
        store: &S,
        mut req: RegisterRequest,
    ) -> Result<IssuedIdentity, IssuanceError>
    where
        S: CredentialStore + ?Sized,
    {
        req.username = req.username.trim().to_string();
        req.email = normalize_email(&req.email);
        validate_registration(&req)?;

        let password_hash = self.hash(req.password).await?;

        let user = store
            .create_user(CreateUser {
                username: req.username,
                email: req.email,
                password_hash,
            })
            .await
            .map_err(|e| {
                if !matches!(e, StoreError::Conflict { .. }) {
                    error!(error = %e, "Failed to persist new user");
                }
                IssuanceError::from(e)
            })?;

        let token = self.issue(user.id)?;
        info!(user_id = user.id, "User registered");

        Ok(IssuedIdentity {
            user: UserProfile::from(&user),
            token,
        })
    }

    /// Checks credentials and issues a token
    pub async fn login<S>(
        &self,
        store: &S,
        req: LoginRequest,
    ) -> Result<IssuedIdentity, IssuanceError>
    where
        S: CredentialStore + ?Sized,
    {
        let email = normalize_email(&req.email);
        let req = LoginRequest { email, ..req };
        req.validate().map_err(IssuanceError::Validation)?;

        let user = store.find_user_by_email(&req.email).await.map_err(|e| {
            error!(error = %e, "Failed to look up user for login");
            IssuanceError::from(e)
        })?;

        let Some(user) = user else {
            // Burn the same work a real verification would
            let _ = self.verify(req.password, self.decoy_hash.clone()).await;
            debug!("Login failed: unknown email");
            return Err(IssuanceError::InvalidCredentials);
        };

        match self.verify(req.password, user.password_hash.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = user.id, "Login failed: wrong password");
                return Err(IssuanceError::InvalidCredentials);
            }
            Err(e) => {
                error!(user_id = user.id, error = %e, "Stored password hash is unusable");
                return Err(e);
            }
        }

        let token = self.issue(user.id)?;
        info!(user_id = user.id, "User logged in");

        Ok(IssuedIdentity {
            user: UserProfile::from(&user),
            token,
        })
    }

    fn issue(&self, user_id: i64) -> Result<IssuedToken, IssuanceError> {
        self.tokens.issue(user_id).map_err(|e| {
            error!(user_id, error = %e, "Failed to sign token");
            IssuanceError::Internal(e.to_string())
        })
    }

    async fn hash(&self, plaintext: String) -> Result<String, IssuanceError> {
        let params = self.params;

        tokio::task::spawn_blocking(move || password::hash_password_with(&plaintext, &params))
            .await
            .map_err(|e| IssuanceError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(|e| {
                error!(error = %e, "Password hashing failed");
                IssuanceError::from(e)
            })
    }

    async fn verify(&self, plaintext: String, hash: String) -> Result<bool, IssuanceError> {
        tokio::task::spawn_blocking(move || password::verify_password(&plaintext, &hash))
            .await
            .map_err(|e| IssuanceError::Internal(format!("Verification task failed: {}", e)))?
            .map_err(IssuanceError::from)
    }
}

/// Runs the derived rules, then the password policy, reporting every failure
fn validate_registration(req: &RegisterRequest) -> Result<(), IssuanceError> {
    let derived = req.validate();
    let policy = password::validate_password_policy(&req.password);

    if derived.is_ok() && policy.is_ok() {
        return Ok(());
    }

    let mut errors = derived.err().unwrap_or_else(ValidationErrors::new);

    if let Err(message) = policy {
        let mut error = ValidationError::new("password_policy");
        error.message = Some(Cow::Owned(message));
        errors.add("password", error);
    }

    Err(IssuanceError::Validation(errors))
}
