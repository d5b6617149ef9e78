//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `AK_DATA_FILE` - JSON database file (default: data/db.json)
//! - `AK_UPLOAD_DIR` - Directory for uploaded images (default: uploads)
//! - `AK_HOST` - Bind address (default: 127.0.0.1)
//! - `AK_PORT` - Listen port (default: 5000)
//! - `AK_BASE_URL` - Public URL of the API (default: <http://localhost:5000>)
//! - `AK_MAX_UPLOAD_BYTES` - Largest accepted image (default: 5 MiB)
//! - `AK_CORS_ORIGINS` - Comma-separated origins allowed to call the API
//! - `AK_ADMIN_EMAIL` / `AK_ADMIN_PASSWORD` - Admin created at start-up when
//!   the data file has none (both or neither)
//! - `AK_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use ashpazkhoone_core::Email;

/// Default upload size limit (5 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const MIN_ADMIN_PASSWORD_LENGTH: usize = 12;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin account to create when the data file has none.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: Email,
    pub password: SecretString,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// JSON database file
    pub data_file: PathBuf,
    /// Directory uploaded images are stored in and served from
    pub upload_dir: PathBuf,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Origins allowed by CORS; empty disables the CORS layer
    pub cors_origins: Vec<String>,
    /// Admin created at start-up if none exists
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Emit JSON logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment
    pub sentry_environment: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/db.json"),
            upload_dir: PathBuf::from("uploads"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            base_url: "http://localhost:5000".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_origins: Vec::new(),
            bootstrap_admin: None,
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the bootstrap
    /// admin credentials are incomplete or weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let host = parse_env("AK_HOST", defaults.host)?;
        let port = parse_env("AK_PORT", defaults.port)?;
        let max_upload_bytes = parse_env("AK_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?;
        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "AK_MAX_UPLOAD_BYTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            data_file: get_optional_env("AK_DATA_FILE").map_or(defaults.data_file, PathBuf::from),
            upload_dir: get_optional_env("AK_UPLOAD_DIR").map_or(defaults.upload_dir, PathBuf::from),
            host,
            port,
            base_url: get_env_or_default("AK_BASE_URL", &defaults.base_url),
            max_upload_bytes,
            cors_origins: get_optional_env("AK_CORS_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            bootstrap_admin: load_bootstrap_admin()?,
            log_json: get_optional_env("AK_LOG_JSON").is_some_and(|v| is_truthy(&v)),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the session cookie should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

fn load_bootstrap_admin() -> Result<Option<BootstrapAdmin>, ConfigError> {
    let email = get_optional_env("AK_ADMIN_EMAIL");
    let password = get_optional_env("AK_ADMIN_PASSWORD");
    match (email, password) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingEnvVar("AK_ADMIN_PASSWORD".to_string())),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar("AK_ADMIN_EMAIL".to_string())),
        (Some(email), Some(password)) => {
            let email = Email::parse(&email).map_err(|e| {
                ConfigError::InvalidEnvVar("AK_ADMIN_EMAIL".to_string(), e.to_string())
            })?;
            let password = SecretString::from(password);
            validate_admin_password(&password, "AK_ADMIN_PASSWORD")?;
            Ok(Some(BootstrapAdmin { email, password }))
        }
    }
}

/// Validate that the bootstrap password is long enough and not a placeholder.
fn validate_admin_password(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_ADMIN_PASSWORD_LENGTH} characters"),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.data_file, PathBuf::from("data/db.json"));
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            host: "0.0.0.0".parse().unwrap(),
            port: 8080,
            ..ApiConfig::default()
        };
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_https_base_url_is_secure() {
        let config = ApiConfig {
            base_url: "https://ashpazkhoone.ir".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.is_secure());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" http://localhost:3000/ ,,https://shop.ir"),
            ["http://localhost:3000", "https://shop.ir"]
        );
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(" OFF "));
    }

    #[test]
    fn test_admin_password_too_short() {
        let result = validate_admin_password(&SecretString::from("short"), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_admin_password_placeholder() {
        let result = validate_admin_password(&SecretString::from("changeme-admin-123"), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_admin_password_valid() {
        let result = validate_admin_password(&SecretString::from("q8#Lm2!vR7zT"), "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_bootstrap_admin_debug_redacts_password() {
        let admin = BootstrapAdmin {
            email: Email::parse("admin@ashpazkhoone.ir").unwrap(),
            password: SecretString::from("q8#Lm2!vR7zT"),
        };
        let debug_output = format!("{admin:?}");
        assert!(debug_output.contains("admin@ashpazkhoone.ir"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("q8#Lm2!vR7zT"));
    }
}
