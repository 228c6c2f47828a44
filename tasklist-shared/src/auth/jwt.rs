/// JWT token generation and validation module
///
/// This module is the token codec: it issues and verifies the stateless bearer
/// tokens that carry a user's identity between requests.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256), pinned on both sides
/// - **Expiration**: configured TTL, checked with zero leeway
/// - **Validation**: signature, algorithm, expiration, issuer, typed subject
/// - **Secret Management**: secrets should be at least 32 bytes (256 bits)
///
/// Verification never touches the database. A valid signature and an unexpired
/// `exp` are the only sources of trust, so tokens cannot be revoked before they
/// expire and the TTL should stay short.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use tasklist_shared::auth::jwt::{JwtSettings, TokenCodec};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = TokenCodec::new(&JwtSettings::new(
///     "your-secret-key-at-least-32-bytes-long",
///     Duration::minutes(15),
/// ));
///
/// let issued = codec.issue(42)?;
/// assert_eq!(codec.verify(&issued.token)?, 42);
/// # Ok(())
/// # }
/// ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Default `iss` claim
pub const DEFAULT_ISSUER: &str = "tasklist";

/// The only accepted signing algorithm
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature does not match the payload
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Header advertises an algorithm other than HS256
    #[error("Unexpected signing algorithm")]
    InvalidAlgorithm,

    /// Issuer claim does not match
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// Claims are missing or have the wrong type
    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),

    /// Not a decodable JWT at all
    #[error("Invalid token format: {0}")]
    Malformed(String),
}

/// Signing configuration for the token codec
///
/// Built once at startup from configuration and never mutated afterwards.
#[derive(Clone)]
pub struct JwtSettings {
    /// HMAC secret
    pub secret: String,

    /// Lifetime of issued tokens
    pub ttl: Duration,

    /// Value of the `iss` claim
    pub issuer: String,
}

impl JwtSettings {
    /// Creates settings with the default issuer
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Overrides the issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// JWT claims structure
///
/// - `sub`: Subject (numeric user ID)
/// - `iss`: Issuer
/// - `iat`: Issued at (Unix timestamp)
/// - `exp`: Expiration (Unix timestamp)
///
/// Tokens are decoded straight into this struct, so a subject that is missing
/// or not an integer fails deserialization instead of being coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: i64,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for `user_id` valid for `expires_in` from now
    ///
    /// A negative `expires_in` produces claims that are already expired.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiry is not a representable
    /// date.
    pub fn new(user_id: i64, issuer: &str, expires_in: Duration) -> Result<Self, JwtError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(expires_in).ok_or_else(|| {
            JwtError::CreateError(format!("Expiry out of range for TTL {}", expires_in))
        })?;

        Ok(Self {
            sub: user_id,
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// A freshly signed token and its expiry instant
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// Compact JWT string
    pub token: String,

    /// When the token stops verifying
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies HS256 identity tokens
///
/// Holds pre-built keys and validation rules. Cheap to share behind an `Arc`;
/// all methods take `&self` and there is no interior mutability.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl TokenCodec {
    /// Builds a codec from settings
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            ttl: settings.ttl,
        }
    }

    /// Issues a token for `user_id` with the configured TTL
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if encoding fails
    pub fn issue(&self, user_id: i64) -> Result<IssuedToken, JwtError> {
        self.issue_with_ttl(user_id, self.ttl)
    }

    /// Issues a token for `user_id` with an explicit TTL
    pub fn issue_with_ttl(&self, user_id: i64, ttl: Duration) -> Result<IssuedToken, JwtError> {
        let claims = Claims::new(user_id, &self.issuer, ttl)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies a token and returns its subject
    ///
    /// # Errors
    ///
    /// - `JwtError::InvalidAlgorithm` if the header advertises anything but HS256
    /// - `JwtError::InvalidSignature` if the signature doesn't match
    /// - `JwtError::Expired` if `exp` is in the past
    /// - `JwtError::InvalidIssuer` if `iss` doesn't match
    /// - `JwtError::InvalidClaims` if `sub`, `iat`, `exp` or `iss` are missing or mistyped
    /// - `JwtError::Malformed` for anything that isn't a JWT
    pub fn verify(&self, token: &str) -> Result<i64, JwtError> {
        self.verify_claims(token).map(|claims| claims.sub)
    }

    /// Verifies a token and returns all of its claims
    pub fn verify_claims(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::Expired,
                    ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                    ErrorKind::InvalidAlgorithm => JwtError::InvalidAlgorithm,
                    ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
                    ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                        JwtError::InvalidClaims(e.to_string())
                    }
                    _ => JwtError::Malformed(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}
