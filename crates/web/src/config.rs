//! Web server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DELICIOUS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `DELICIOUS_BASE_URL` - Public URL of the site
//!
//! ## Optional
//! - `DELICIOUS_HOST` - Bind address (default: 127.0.0.1)
//! - `DELICIOUS_PORT` - Listen port (default: 7777)
//! - `DELICIOUS_UPLOADS_DIR` - Where store photos are written (default: crates/web/public/uploads)
//! - `DELICIOUS_STATIC_DIR` - Stylesheets, scripts and images (default: crates/web/static)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Fraction of errors sent (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Fraction of transactions traced (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub base_url: Url,
    /// Directory uploaded photos are written to and served from
    pub uploads_dir: PathBuf,
    /// Directory of static assets served under `/static`
    pub static_dir: PathBuf,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// Sentry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key/value source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let database_url = env.database_url("DELICIOUS_DATABASE_URL")?;
        let host = env.parsed::<IpAddr>("DELICIOUS_HOST", "127.0.0.1")?;
        let port = env.parsed::<u16>("DELICIOUS_PORT", "7777")?;
        let base_url = parse_base_url(&env.required("DELICIOUS_BASE_URL")?)?;
        let uploads_dir = PathBuf::from(env.or_default("DELICIOUS_UPLOADS_DIR", "crates/web/public/uploads"));
        let static_dir = PathBuf::from(env.or_default("DELICIOUS_STATIC_DIR", "crates/web/static"));

        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN"),
            environment: env.optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.rate("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: env.rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            uploads_dir,
            static_dir,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("DELICIOUS_BASE_URL".to_string(), msg);

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("URL must have a host".to_string()));
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional environment variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// A sampling rate within `[0, 1]`.
    fn rate(&self, key: &str, default: &str) -> Result<f32, ConfigError> {
        let rate = self.parsed::<f32>(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be between 0 and 1 (got {rate})"),
            ))
        }
    }

    /// Get database URL with fallback to generic `DATABASE_URL` (set by hosted postgres attach).
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        (self.0)(primary_key)
            .or_else(|| (self.0)("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WebConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        WebConfig::from_lookup(|key| map.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DELICIOUS_DATABASE_URL", "postgres://localhost/delicious"),
        ("DELICIOUS_BASE_URL", "http://localhost:7777"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(MINIMAL).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:7777");
        assert_eq!(config.uploads_dir, PathBuf::from("crates/web/public/uploads"));
        assert_eq!(config.static_dir, PathBuf::from("crates/web/static"));
        assert!(config.sentry.dsn.is_none());
        assert!((config.sentry.sample_rate - 1.0).abs() < f32::EPSILON);
        assert!(config.sentry.traces_sample_rate.abs() < f32::EPSILON);
        assert!(!config.is_https());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[
            ("DATABASE_URL", "postgres://fallback/db"),
            ("DELICIOUS_BASE_URL", "https://delicious.example"),
        ])
        .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
        assert!(config.is_https());
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("DELICIOUS_BASE_URL", "http://localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DELICIOUS_DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgres://x/y")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DELICIOUS_BASE_URL"));
    }

    #[test]
    fn test_base_url_needs_host() {
        let mut vars = MINIMAL.to_vec();
        vars[1] = ("DELICIOUS_BASE_URL", "mailto:wes@example.com");

        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_invalid_port() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("DELICIOUS_PORT", "seventy"));

        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "DELICIOUS_PORT"));
    }

    #[test]
    fn test_sample_rate_range() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("SENTRY_TRACES_SAMPLE_RATE", "1.5"));
        assert!(load(&vars).is_err());

        let mut vars = MINIMAL.to_vec();
        vars.push(("SENTRY_SAMPLE_RATE", "0.25"));
        vars.push(("SENTRY_DSN", "https://key@sentry.example/1"));
        let config = load(&vars).unwrap();
        assert!((config.sentry.sample_rate - 0.25).abs() < f32::EPSILON);
        assert!(config.sentry.dsn.is_some());
    }
}
