//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `OPS_ALERT_EMAIL` - Recipient for operational alerts (new orders,
//!   customer cancellations)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 4000)
//! - `BASE_URL` - Public URL of the API (default: `http://localhost:4000`)
//! - `CLIENT_BASE_URL` - Storefront origin for CORS and mail links
//!   (default: `http://localhost:5173`)
//! - `REMINDER_INTERVAL_SECS` - Reminder sweep cadence (default: 3600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! ## Mail (the block is optional; if `SMTP_HOST` is set the rest is required)
//! - `SMTP_HOST`, `SMTP_PORT` (default 587), `SMTP_USERNAME`,
//!   `SMTP_PASSWORD`, `SMTP_FROM`
//!
//! ## Payments (optional; if `PAYMENT_KEY_ID` is set the rest is required)
//! - `PAYMENT_KEY_ID`, `PAYMENT_KEY_SECRET`, `PAYMENT_WEBHOOK_SECRET`,
//!   `PAYMENT_BASE_URL` (default: `https://api.razorpay.com/v1`)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use marigold_core::Email;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default reminder sweep interval (one hour).
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 3600;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Storefront client origin, used for CORS and links in mail
    pub client_base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Recipient for operational alert mail
    pub ops_alert_email: Email,
    /// SMTP configuration; `None` disables outbound mail
    pub mail: Option<MailConfig>,
    /// Payment gateway configuration; `None` disables payment routes
    pub payments: Option<PaymentConfig>,
    /// Seconds between reminder sweeps
    pub reminder_interval_secs: u64,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (e.g. "production")
    pub sentry_environment: Option<String>,
}

/// SMTP mail configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct MailConfig {
    /// SMTP relay hostname
    pub smtp_host: String,
    /// SMTP port (STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// From address for all outbound mail
    pub from_address: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Payment gateway configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct PaymentConfig {
    /// Gateway key id (public, embedded in client checkout)
    pub key_id: String,
    /// Gateway key secret, used for API auth and signature verification
    pub key_secret: SecretString,
    /// Webhook signing secret
    pub webhook_secret: SecretString,
    /// Gateway REST base URL
    pub base_url: String,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = get_url_or_default("BASE_URL", "http://localhost:4000")?;
        let client_base_url = get_url_or_default("CLIENT_BASE_URL", "http://localhost:5173")?;

        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let ops_alert_email = Email::parse(&get_required_env("OPS_ALERT_EMAIL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("OPS_ALERT_EMAIL".to_string(), e.to_string()))?;

        let reminder_interval_secs = match get_optional_env("REMINDER_INTERVAL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("REMINDER_INTERVAL_SECS".to_string(), e.to_string())
            })?,
            None => DEFAULT_REMINDER_INTERVAL_SECS,
        };

        let mail = MailConfig::from_env()?;
        let payments = PaymentConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            client_base_url,
            session_secret,
            ops_alert_email,
            mail,
            payments,
            reminder_interval_secs,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MailConfig {
    /// Load the mail block; `None` when `SMTP_HOST` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        }))
    }
}

impl PaymentConfig {
    /// Load the payments block; `None` when `PAYMENT_KEY_ID` is unset.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key_id) = get_optional_env("PAYMENT_KEY_ID") else {
            return Ok(None);
        };

        Ok(Some(Self {
            key_id,
            key_secret: get_validated_secret("PAYMENT_KEY_SECRET")?,
            webhook_secret: get_validated_secret("PAYMENT_WEBHOOK_SECRET")?,
            base_url: get_url_or_default("PAYMENT_BASE_URL", "https://api.razorpay.com/v1")?,
        }))
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a URL-valued environment variable (or its default), validating that
/// it parses and stripping any trailing slash.
fn get_url_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = get_env_or_default(key, default);
    url::Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-session-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_mail_config_debug_redacts_password() {
        let config = MailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "apikey".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "Marigold <no-reply@example.com>".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }

    #[test]
    fn test_payment_config_debug_redacts_secrets() {
        let config = PaymentConfig {
            key_id: "rzp_test_abc123".to_string(),
            key_secret: SecretString::from("gw_key_secret_value"),
            webhook_secret: SecretString::from("gw_webhook_secret_value"),
            base_url: "https://api.razorpay.com/v1".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("rzp_test_abc123"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("gw_key_secret_value"));
        assert!(!debug_output.contains("gw_webhook_secret_value"));
    }

    fn test_config() -> ApiConfig {
        ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            base_url: "http://localhost:4000".to_string(),
            client_base_url: "http://localhost:5173".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            ops_alert_email: Email::parse("ops@example.com").unwrap(),
            mail: None,
            payments: None,
            reminder_interval_secs: 3600,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}
