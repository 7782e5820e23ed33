//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 4000)
//! - `JWT_TTL_HOURS` - Token lifetime in hours (default: 168)
//! - `DATA_DIR` - Directory holding the JSON record files (default: data)
//! - `CATALOG_BASE_URL` - Remote catalog API (default: <https://fakestoreapi.com>)
//! - `CATALOG_CACHE_TTL_SECS` - Catalog and query cache lifetime (default: 60)
//! - `CATALOG_TIMEOUT_SECS` - Remote catalog request timeout (default: 10)
//! - `CORS_ORIGINS` - Comma separated allowed origins
//!   (default: `http://localhost:5173,http://localhost:4173`)
//! - `ADMIN_EMAIL` - Bootstrap admin email (default: admin@kranes.market)
//! - `ADMIN_PASSWORD` - Bootstrap admin password (default: Admin123!)
//! - `ADMIN_NAME` - Bootstrap admin display name (default: Store Owner)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! Blank values are treated as unset.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:4173";
const DEFAULT_CATALOG_URL: &str = "https://fakestoreapi.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not set")]
    Missing { key: &'static str },

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{key} is not safe to use: {reason}")]
    WeakSecret { key: &'static str, reason: String },
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory holding the JSON record files
    pub data_dir: PathBuf,
    /// Session token settings
    pub auth: AuthConfig,
    /// Remote catalog settings
    pub catalog: CatalogConfig,
    /// Admin account created at startup when none exists
    pub bootstrap_admin: BootstrapAdmin,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Session token configuration.
///
/// `Debug` never prints the signing secret.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: SecretString,
    /// Token lifetime
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Remote catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the remote catalog API
    pub base_url: Url,
    /// How long fetched catalogs and query pages stay cached
    pub cache_ttl: Duration,
    /// Remote request timeout
    pub timeout: Duration,
}

/// Bootstrap admin credentials.
///
/// `Debug` never prints the password.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: SecretString,
    pub name: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl Default for BootstrapAdmin {
    fn default() -> Self {
        Self {
            email: "admin@kranes.market".to_string(),
            password: SecretString::from("Admin123!"),
            name: "Store Owner".to_string(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from the process environment, after merging in a
    /// `.env` file when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `JWT_SECRET` is missing or weak, or if any
    /// other variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let jwt_secret = env::required("JWT_SECRET")?;
        secret::check(&jwt_secret).map_err(|reason| ConfigError::WeakSecret {
            key: "JWT_SECRET",
            reason,
        })?;
        let ttl_hours: u64 = env::parsed("JWT_TTL_HOURS", 168)?;

        Ok(Self {
            host: env::parsed("API_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: env::parsed("API_PORT", 4000)?,
            data_dir: PathBuf::from(env::text("DATA_DIR", "data")),
            auth: AuthConfig {
                jwt_secret: SecretString::from(jwt_secret),
                token_ttl: Duration::from_secs(ttl_hours.saturating_mul(3600)),
            },
            catalog: CatalogConfig::from_env()?,
            bootstrap_admin: BootstrapAdmin::from_env(),
            cors_origins: parse_origins(&env::text("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            sentry_dsn: env::var("SENTRY_DSN"),
            sentry_environment: env::var("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::text("CATALOG_BASE_URL", DEFAULT_CATALOG_URL);

        Ok(Self {
            base_url: Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
                key: "CATALOG_BASE_URL",
                reason: e.to_string(),
            })?,
            cache_ttl: Duration::from_secs(env::parsed("CATALOG_CACHE_TTL_SECS", 60)?),
            timeout: Duration::from_secs(env::parsed("CATALOG_TIMEOUT_SECS", 10)?),
        })
    }
}

impl BootstrapAdmin {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            email: env::var("ADMIN_EMAIL").unwrap_or(defaults.email),
            password: env::var("ADMIN_PASSWORD").map_or(defaults.password, SecretString::from),
            name: env::var("ADMIN_NAME").unwrap_or(defaults.name),
        }
    }
}

/// Split a comma separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

mod env {
    use std::fmt::Display;
    use std::str::FromStr;

    use super::ConfigError;

    pub fn var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn required(key: &'static str) -> Result<String, ConfigError> {
        var(key).ok_or(ConfigError::Missing { key })
    }

    pub fn text(key: &str, default: &str) -> String {
        var(key).unwrap_or_else(|| default.to_string())
    }

    pub fn parsed<T>(key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        var(key).map_or(Ok(default), |raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
    }
}

/// Signing secret checks: length, obvious placeholders and byte entropy.
mod secret {
    const MIN_LENGTH: usize = 32;
    const MIN_BITS_PER_BYTE: f64 = 3.3;
    const PLACEHOLDERS: &[&str] = &[
        "changeme",
        "change-me",
        "placeholder",
        "example",
        "secret",
        "password",
        "your-",
        "xxx",
        "todo",
    ];

    pub fn check(value: &str) -> Result<(), String> {
        if value.len() < MIN_LENGTH {
            return Err(format!(
                "must be at least {MIN_LENGTH} characters, got {}",
                value.len()
            ));
        }

        let lower = value.to_ascii_lowercase();
        if let Some(pattern) = PLACEHOLDERS.iter().find(|p| lower.contains(**p)) {
            return Err(format!("looks like a placeholder (contains '{pattern}')"));
        }

        let bits = entropy(value);
        if bits < MIN_BITS_PER_BYTE {
            return Err(format!(
                "entropy is {bits:.2} bits per byte, need {MIN_BITS_PER_BYTE:.1}; generate it randomly"
            ));
        }

        Ok(())
    }

    /// Shannon entropy over the byte distribution.
    #[allow(clippy::cast_precision_loss)] // Lengths here are tiny
    pub fn entropy(value: &str) -> f64 {
        let mut counts = [0usize; 256];
        for byte in value.bytes() {
            if let Some(count) = counts.get_mut(usize::from(byte)) {
                *count += 1;
            }
        }

        let len = value.len() as f64;
        counts
            .iter()
            .filter(|count| **count > 0)
            .map(|count| {
                let p = *count as f64 / len;
                -p * p.log2()
            })
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy() {
        assert!(secret::entropy("").abs() < f64::EPSILON);
        assert!((secret::entropy("abab") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_secret_checks() {
        let too_short = secret::check("q8Z!r2Lx").unwrap_err();
        assert!(too_short.contains("at least 32"));

        let placeholder = secret::check("please-changeme-before-deploying-1234").unwrap_err();
        assert!(placeholder.contains("changeme"));

        let repetitive = secret::check(&"ab".repeat(20)).unwrap_err();
        assert!(repetitive.contains("entropy"));

        assert!(secret::check("q8Z!r2Lx@9vT#m4Kp$7wN&e1Yb^c6Hs3").is_ok());
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins(" http://localhost:5173/ , ,https://shop.example.org");
        assert_eq!(
            origins,
            vec![
                "http://localhost:5173".to_string(),
                "https://shop.example.org".to_string()
            ]
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = AuthConfig {
            jwt_secret: SecretString::from("super_secret_signing_key_value"),
            token_ttl: Duration::from_secs(3600),
        };
        let admin = BootstrapAdmin::default();

        let debug_output = format!("{auth:?} {admin:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("admin@kranes.market"));
        assert!(!debug_output.contains("super_secret_signing_key_value"));
        assert!(!debug_output.contains("Admin123!"));
    }
}
