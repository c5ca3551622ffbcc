//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DOCUMENT_STORE_URL` - `PostgreSQL` connection string for the product document store
//! - `RELATIONAL_HOST` - Account database host
//! - `RELATIONAL_DATABASE` - Account database name
//! - `RELATIONAL_USERNAME` - User for static password authentication
//! - `BLOB_ACCOUNT_URL` - Object store account URL (e.g., `https://acct.blob.core.windows.net`)
//! - `BLOB_SAS_TOKEN` - Shared access signature for the image container
//!
//! ## Optional
//! - `SERVER_HOST` - Bind address (default: 127.0.0.1)
//! - `SERVER_PORT` - Listen port (default: 8000)
//! - `RELATIONAL_PORT` - Account database port (default: 5432)
//! - `RELATIONAL_PASSWORD` - Static password (last provider in the credential chain)
//! - `RELATIONAL_IDENTITY_USERNAME` - Principal used with access tokens (default: `RELATIONAL_USERNAME`)
//! - `RELATIONAL_TOKEN_RESOURCE` - Token audience for the account database
//! - `RELATIONAL_DRIVER` - Driver family to select (default: postgres)
//! - `RELATIONAL_MIN_DRIVER_VERSION` - Oldest acceptable driver version (default: 3.0)
//! - `IDENTITY_ENDPOINT` / `IDENTITY_HEADER` - Platform workload identity endpoint
//! - `BLOB_CONTAINER` - Image container name (default: product-images)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::credentials::DriverVersion;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 2.5;

/// Default audience for access tokens presented to the account database.
pub const DEFAULT_TOKEN_RESOURCE: &str = "https://ossrdbms-aad.database.windows.net";

/// Instance metadata endpoint used when no platform identity endpoint is set.
pub const DEFAULT_IDENTITY_ENDPOINT: &str =
    "http://169.254.169.254/metadata/identity/oauth2/token";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Document store connection URL (contains password)
    pub document_store_url: SecretString,
    /// Account database configuration
    pub relational: RelationalConfig,
    /// Object store configuration
    pub blob: BlobConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Account database connection settings and credential chain inputs.
///
/// Implements `Debug` manually to redact the static password.
#[derive(Clone)]
pub struct RelationalConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    /// User for the static password provider
    pub username: String,
    /// Static password, if configured
    pub password: Option<SecretString>,
    /// Principal presented together with identity access tokens
    pub identity_username: String,
    /// Audience requested when exchanging an identity for an access token
    pub token_resource: String,
    /// Workload identity endpoint (instance metadata or platform-provided)
    pub identity_endpoint: Url,
    /// Header secret required by platform-provided identity endpoints
    pub identity_header: Option<SecretString>,
    /// Driver family to select
    pub driver: String,
    /// Oldest acceptable driver version
    pub min_driver_version: DriverVersion,
}

impl std::fmt::Debug for RelationalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("identity_username", &self.identity_username)
            .field("token_resource", &self.token_resource)
            .field("identity_endpoint", &self.identity_endpoint.as_str())
            .field(
                "identity_header",
                &self.identity_header.as_ref().map(|_| "[REDACTED]"),
            )
            .field("driver", &self.driver)
            .field("min_driver_version", &self.min_driver_version)
            .finish()
    }
}

/// Object store settings.
///
/// Implements `Debug` manually to redact the SAS token.
#[derive(Clone)]
pub struct BlobConfig {
    /// Account endpoint, without container
    pub account_url: Url,
    /// Container holding product images
    pub container: String,
    /// Shared access signature (query string, without the leading `?`)
    pub sas_token: SecretString,
}

impl std::fmt::Debug for BlobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobConfig")
            .field("account_url", &self.account_url.as_str())
            .field("container", &self.container)
            .field("sas_token", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the static password fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("SERVER_HOST", "127.0.0.1")?;
        let port = parse_env("SERVER_PORT", "8000")?;
        let document_store_url = get_required_secret("DOCUMENT_STORE_URL")?;
        let relational = RelationalConfig::from_env()?;
        let blob = BlobConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            document_store_url,
            relational,
            blob,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RelationalConfig {
    /// Load the account database settings on their own.
    ///
    /// The CLI uses this directly; it needs the credential chain but none of
    /// the HTTP or object store settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = get_required_env("RELATIONAL_USERNAME")?;
        let password = match get_optional_env("RELATIONAL_PASSWORD") {
            Some(value) => {
                validate_secret_strength(&value, "RELATIONAL_PASSWORD")?;
                Some(SecretString::from(value))
            }
            None => None,
        };
        let identity_endpoint = get_env_or_default("IDENTITY_ENDPOINT", DEFAULT_IDENTITY_ENDPOINT);
        let identity_endpoint = Url::parse(&identity_endpoint).map_err(|e| {
            ConfigError::InvalidEnvVar("IDENTITY_ENDPOINT".to_string(), e.to_string())
        })?;

        Ok(Self {
            host: get_required_env("RELATIONAL_HOST")?,
            port: parse_env("RELATIONAL_PORT", "5432")?,
            database: get_required_env("RELATIONAL_DATABASE")?,
            identity_username: get_optional_env("RELATIONAL_IDENTITY_USERNAME")
                .unwrap_or_else(|| username.clone()),
            username,
            password,
            token_resource: get_env_or_default("RELATIONAL_TOKEN_RESOURCE", DEFAULT_TOKEN_RESOURCE),
            identity_endpoint,
            identity_header: get_optional_env("IDENTITY_HEADER").map(SecretString::from),
            driver: get_env_or_default("RELATIONAL_DRIVER", "postgres"),
            min_driver_version: parse_env("RELATIONAL_MIN_DRIVER_VERSION", "3.0")?,
        })
    }
}

impl BlobConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let account_url = get_required_env("BLOB_ACCOUNT_URL")?;
        let account_url = Url::parse(&account_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BLOB_ACCOUNT_URL".to_string(), e.to_string())
        })?;
        let sas_token = get_required_env("BLOB_SAS_TOKEN")?;

        Ok(Self {
            account_url,
            container: get_env_or_default("BLOB_CONTAINER", "product-images"),
            sas_token: SecretString::from(sas_token.trim_start_matches('?').to_owned()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn relational() -> RelationalConfig {
        RelationalConfig {
            host: "accounts.internal".to_string(),
            port: 5432,
            database: "accounts".to_string(),
            username: "catalog_app".to_string(),
            password: Some(SecretString::from("kT9#vQ2!mZ7@pL4$")),
            identity_username: "catalog-identity".to_string(),
            token_resource: DEFAULT_TOKEN_RESOURCE.to_string(),
            identity_endpoint: Url::parse(DEFAULT_IDENTITY_ENDPOINT).unwrap(),
            identity_header: Some(SecretString::from("header-secret-value")),
            driver: "postgres".to_string(),
            min_driver_version: "3.0".parse().unwrap(),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("kT9#vQ2!mZ7@pL4$", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            document_store_url: SecretString::from("postgres://localhost/documents"),
            relational: relational(),
            blob: BlobConfig {
                account_url: Url::parse("https://acct.blob.core.windows.net").unwrap(),
                container: "product-images".to_string(),
                sas_token: SecretString::from("sv=2022&sig=abc"),
            },
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_relational_debug_redacts_secrets() {
        let debug_output = format!("{:?}", relational());

        assert!(debug_output.contains("accounts.internal"));
        assert!(debug_output.contains("catalog-identity"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("kT9#vQ2!mZ7@pL4$"));
        assert!(!debug_output.contains("header-secret-value"));
    }

    #[test]
    fn test_blob_debug_redacts_sas() {
        let config = BlobConfig {
            account_url: Url::parse("https://acct.blob.core.windows.net").unwrap(),
            container: "product-images".to_string(),
            sas_token: SecretString::from("sv=2022&sig=topsecret"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("product-images"));
        assert!(!debug_output.contains("topsecret"));
    }
}
