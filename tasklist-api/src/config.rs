/// Configuration management for the API server
///
/// Configuration is read once at startup from environment variables (and a
/// `.env` file if present) into an immutable [`Config`]. Missing or invalid
/// required values abort startup.
///
/// # Environment Variables
///
/// - `JWT_SECRET`: HMAC signing secret, at least 32 bytes (required)
/// - `JWT_TTL`: token lifetime such as `15m` or `1h`, at most a year (required)
/// - `JWT_ISSUER`: `iss` claim (default: tasklist)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS` / `DATABASE_MIN_CONNECTIONS` (default: 10 / 2)
/// - `DATABASE_CONNECT_TIMEOUT` / `DATABASE_IDLE_TIMEOUT` (default: 30s / 10m)
/// - `API_HOST` / `API_PORT` (default: 0.0.0.0 / 8080)
/// - `API_REQUEST_TIMEOUT` (default: 30s)
/// - `API_CORS_ORIGINS`: comma-separated, `*` for any (default: *)
/// - `API_PRODUCTION`: enables HSTS (default: false)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
///
/// Durations use `humantime` syntax.
///
/// # Example
///
/// ```no_run
/// use tasklist_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::{env, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context};
use tasklist_shared::{
    auth::jwt::{JwtSettings, DEFAULT_ISSUER},
    db::pool::DatabaseConfig,
};

/// Shortest accepted `JWT_SECRET`, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted `JWT_TTL`
pub const MAX_JWT_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtSettings,
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Deadline for a whole request
    pub request_timeout: Duration,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            cors_origins: vec!["*".to_string()],
            production: false,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for development
    #[default]
    Pretty,

    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or any value fails
    /// to parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| anyhow!("{} environment variable is required", key))
        };

        let jwt_secret = require("JWT_SECRET")?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            bail!("JWT_SECRET must be at least {} bytes long", MIN_SECRET_LENGTH);
        }

        let jwt_ttl = parse_duration("JWT_TTL", &require("JWT_TTL")?)?;
        if jwt_ttl.is_zero() {
            bail!("JWT_TTL must be greater than zero");
        }
        if jwt_ttl > MAX_JWT_TTL {
            bail!(
                "JWT_TTL must be at most {}",
                humantime::format_duration(MAX_JWT_TTL)
            );
        }
        let jwt_ttl = chrono::Duration::from_std(jwt_ttl).context("JWT_TTL is out of range")?;

        let jwt = JwtSettings::new(jwt_secret, jwt_ttl)
            .with_issuer(get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()));

        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            url: require("DATABASE_URL")?,
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                db_defaults.max_connections,
            )?,
            min_connections: parse_or(
                "DATABASE_MIN_CONNECTIONS",
                get("DATABASE_MIN_CONNECTIONS"),
                db_defaults.min_connections,
            )?,
            connect_timeout: duration_or(
                "DATABASE_CONNECT_TIMEOUT",
                get("DATABASE_CONNECT_TIMEOUT"),
                db_defaults.connect_timeout,
            )?,
            idle_timeout: match get("DATABASE_IDLE_TIMEOUT") {
                Some(raw) => Some(parse_duration("DATABASE_IDLE_TIMEOUT", &raw)?),
                None => db_defaults.idle_timeout,
            },
            max_lifetime: db_defaults.max_lifetime,
        };

        if database.min_connections > database.max_connections {
            bail!("DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS");
        }

        let api_defaults = ApiConfig::default();
        let api = ApiConfig {
            host: get("API_HOST").unwrap_or(api_defaults.host),
            port: parse_or("API_PORT", get("API_PORT"), api_defaults.port)?,
            request_timeout: duration_or(
                "API_REQUEST_TIMEOUT",
                get("API_REQUEST_TIMEOUT"),
                api_defaults.request_timeout,
            )?,
            cors_origins: match get("API_CORS_ORIGINS") {
                Some(raw) => raw
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
                None => api_defaults.cors_origins,
            },
            production: parse_or(
                "API_PRODUCTION",
                get("API_PRODUCTION"),
                api_defaults.production,
            )?,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api,
            database,
            jwt,
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_duration(key: &str, raw: &str) -> anyhow::Result<Duration> {
    humantime::parse_duration(raw.trim())
        .with_context(|| format!("{} must be a duration like '30s' or '15m', got '{}'", key, raw))
}

fn duration_or(key: &str, raw: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    raw.map_or(Ok(default), |raw| parse_duration(key, &raw))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}
