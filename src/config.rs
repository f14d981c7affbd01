use crate::auth::expiration::{validate_expiration_time, ExpirationSpec, DEFAULT_EXPIRATION};
use crate::auth::key::MIN_SECRET_LEN;
use crate::auth::rate_limit::{
    DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW, MAX_WINDOW,
};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use zeroize::Zeroizing;

pub const DEFAULT_USERNAME: &str = "picnic";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGIN: &str = "*";
pub const DEFAULT_BODY_TIMEOUT_MS: u64 = 5_000;

/// The single account allowed to authenticate.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    /// bcrypt hash of the password
    pub password_hash: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct Config {
    pub account: Account,

    // Tokens
    /// Only needed to derive the token key; wiped when the config is dropped
    pub jwt_secret: Zeroizing<String>,
    pub expiration: ExpirationSpec,

    // Server
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub body_timeout: Duration,

    // Rate limiting
    pub rate_limit_max_attempts: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_cleanup_interval: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account", &self.account)
            .field("jwt_secret", &"[REDACTED]")
            .field("expiration", &self.expiration.as_str())
            .field("bind_addr", &self.bind_addr)
            .field("cors_origin", &self.cors_origin)
            .field("body_timeout", &self.body_timeout)
            .field("rate_limit_max_attempts", &self.rate_limit_max_attempts)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "rate_limit_cleanup_interval",
                &self.rate_limit_cleanup_interval,
            )
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        let _ = dotenvy::dotenv();

        let username =
            env::var("PICNIC_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string());
        if username.is_empty() {
            return Err(ConfigError::InvalidValue(
                "PICNIC_USERNAME".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        let password_hash = env::var("PICNIC_PASSWORD_BCRYPT")
            .map_err(|_| ConfigError::MissingVar("PICNIC_PASSWORD_BCRYPT".to_string()))?;

        // A malformed hash would make every login fail; refuse to start instead
        if let Err(e) = bcrypt::verify("", &password_hash) {
            return Err(ConfigError::InvalidValue(
                "PICNIC_PASSWORD_BCRYPT".to_string(),
                format!("not a bcrypt hash: {}", e),
            ));
        }

        let jwt_secret = env::var("PICNIC_JWT_SECRET")
            .map(Zeroizing::new)
            .map_err(|_| ConfigError::MissingVar("PICNIC_JWT_SECRET".to_string()))?;
        if jwt_secret.chars().count() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "PICNIC_JWT_SECRET".to_string(),
                format!("must be at least {} characters", MIN_SECRET_LEN),
            ));
        }

        let expiration = load_expiration();

        let port = parse_env_or_default("PICNIC_PORT", DEFAULT_PORT)?;
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let cors_origin =
            env::var("PICNIC_CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());
        if axum::http::HeaderValue::from_str(&cors_origin).is_err() {
            return Err(ConfigError::InvalidValue(
                "PICNIC_CORS_ORIGIN".to_string(),
                "not a valid header value".to_string(),
            ));
        }

        let body_timeout_ms = parse_env_or_default("PICNIC_BODY_TIMEOUT_MS", DEFAULT_BODY_TIMEOUT_MS)?;

        let rate_limit_max_attempts =
            parse_env_or_default("PICNIC_RATE_LIMIT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if rate_limit_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "PICNIC_RATE_LIMIT_MAX_ATTEMPTS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let rate_limit_window_secs =
            parse_env_or_default("PICNIC_RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW.as_secs())?;
        if rate_limit_window_secs == 0 || rate_limit_window_secs > MAX_WINDOW.as_secs() {
            return Err(ConfigError::InvalidValue(
                "PICNIC_RATE_LIMIT_WINDOW_SECS".to_string(),
                format!("must be between 1 and {}", MAX_WINDOW.as_secs()),
            ));
        }

        let rate_limit_cleanup_secs = parse_env_or_default(
            "PICNIC_RATE_LIMIT_CLEANUP_SECS",
            DEFAULT_CLEANUP_INTERVAL.as_secs(),
        )?;
        if rate_limit_cleanup_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "PICNIC_RATE_LIMIT_CLEANUP_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            account: Account {
                username,
                password_hash,
            },
            jwt_secret,
            expiration,
            bind_addr,
            cors_origin,
            body_timeout: Duration::from_millis(body_timeout_ms),
            rate_limit_max_attempts,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            rate_limit_cleanup_interval: Duration::from_secs(rate_limit_cleanup_secs),
        })
    }
}

/// Read `PICNIC_JWT_EXPIRATION_TIME`, falling back to the default when it is
/// missing or malformed.
fn load_expiration() -> ExpirationSpec {
    let raw = env::var("PICNIC_JWT_EXPIRATION_TIME")
        .unwrap_or_else(|_| DEFAULT_EXPIRATION.to_string());

    match validate_expiration_time(&raw) {
        Some(spec) => spec,
        None => {
            tracing::warn!(
                invalid = %raw,
                fallback = DEFAULT_EXPIRATION,
                "Invalid token expiration time, using default"
            );
            ExpirationSpec::default_spec()
        }
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
