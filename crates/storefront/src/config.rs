//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_API_URL` - Base URL of the backend REST API (e.g. `http://localhost:5000/api`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BACKEND_TIMEOUT_SECS` - Backend request timeout (default: 15)
//! - `CATALOG_CACHE_TTL_SECS` - Product cache lifetime (default: 60)
//! - `RAZORPAY_KEY_ID` - Razorpay key id; online payment is offered only when set
//! - `PAYMENT_CURRENCY` - Currency sent to the gateway (default: INR)
//! - `PAYMENT_THEME_COLOR` - Gateway widget accent color (default: #3B82F6)
//! - `STORE_NAME` - Name shown in the gateway widget (default: Suraj Electronics)
//! - `STORE_PHONE` - Contact number shown on the complaints page
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.1)
//! - `LOG_FORMAT` - `text` or `json` (default: text)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use suraj_core::CurrencyCode;
use thiserror::Error;
use url::Url;

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
    #[error("Placeholder value in {0}: {1}")]
    Placeholder(String, String),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Backend REST API settings
    pub backend: BackendConfig,
    /// Payment and store identity settings
    pub payment: PaymentConfig,
    /// Contact number shown to customers filing complaints
    pub store_phone: Option<String>,
    /// Sentry settings
    pub sentry: SentryConfig,
    /// Log output format
    pub log_format: LogFormat,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL all endpoint paths are appended to
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long product responses stay cached
    pub catalog_cache_ttl: Duration,
}

/// Payment gateway configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Razorpay public key id. `None` disables online payment.
    pub razorpay_key_id: Option<String>,
    pub currency: CurrencyCode,
    pub theme_color: String,
    pub store_name: String,
}

impl PaymentConfig {
    /// Whether the hosted gateway can be offered at checkout.
    #[must_use]
    pub const fn gateway_enabled(&self) -> bool {
        self.razorpay_key_id.is_some()
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            razorpay_key_id: None,
            currency: CurrencyCode::INR,
            theme_color: "#3B82F6".to_string(),
            store_name: "Suraj Electronics".to_string(),
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the gateway key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let backend = BackendConfig::from_env()?;
        let payment = PaymentConfig::from_env()?;
        let store_phone = get_optional_env("STORE_PHONE");
        let sentry = SentryConfig::from_env()?;
        let log_format = match get_env_or_default("LOG_FORMAT", "text").as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected 'text' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            payment,
            store_phone,
            sentry,
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("BACKEND_API_URL")?;
        let api_url = parse_api_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_API_URL".to_string(), e))?;
        let timeout_secs: u64 = parse_env("BACKEND_TIMEOUT_SECS", "15")?;
        let ttl_secs: u64 = parse_env("CATALOG_CACHE_TTL_SECS", "60")?;

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            catalog_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let razorpay_key_id = get_optional_env("RAZORPAY_KEY_ID")
            .filter(|key| !key.trim().is_empty())
            .map(|key| reject_placeholder(&key, "RAZORPAY_KEY_ID").map(|()| key))
            .transpose()?;
        let currency = get_env_or_default("PAYMENT_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("PAYMENT_CURRENCY".to_string(), e))?;
        let theme_color = get_env_or_default("PAYMENT_THEME_COLOR", "#3B82F6");
        if !is_hex_color(&theme_color) {
            return Err(ConfigError::InvalidEnvVar(
                "PAYMENT_THEME_COLOR".to_string(),
                format!("expected a #RRGGBB color, got '{theme_color}'"),
            ));
        }

        Ok(Self {
            razorpay_key_id,
            currency,
            theme_color,
            store_name: get_env_or_default("STORE_NAME", "Suraj Electronics"),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the backend base URL and normalize it to end with `/`.
///
/// `Url::join` replaces the last path segment unless the base ends in a
/// slash, so `http://host/api` must become `http://host/api/`.
fn parse_api_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reject values that look like unfilled template placeholders.
fn reject_placeholder(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::Placeholder(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_appends_slash() {
        let url = parse_api_url("http://localhost:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
        assert_eq!(
            url.join("products").unwrap().as_str(),
            "http://localhost:5000/api/products"
        );
    }

    #[test]
    fn test_parse_api_url_rejects_bad_input() {
        assert!(parse_api_url("not a url").is_err());
        assert!(parse_api_url("ftp://example.org/api").is_err());
    }

    #[test]
    fn test_reject_placeholder() {
        let err = reject_placeholder("your-razorpay-key", "RAZORPAY_KEY_ID").unwrap_err();
        assert!(matches!(err, ConfigError::Placeholder(_, _)));
        assert!(reject_placeholder("rzp_test_1DP5mmOlF5G5ag", "RAZORPAY_KEY_ID").is_ok());
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#3B82F6"));
        assert!(!is_hex_color("3B82F6"));
        assert!(!is_hex_color("#3B82F"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_payment_gateway_enabled() {
        let mut payment = PaymentConfig::default();
        assert!(!payment.gateway_enabled());
        payment.razorpay_key_id = Some("rzp_test_abc".to_string());
        assert!(payment.gateway_enabled());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://surajelectronics.in".to_string(),
            backend: BackendConfig {
                api_url: parse_api_url("http://localhost:5000/api").unwrap(),
                timeout: Duration::from_secs(15),
                catalog_cache_ttl: Duration::from_secs(60),
            },
            payment: PaymentConfig::default(),
            store_phone: None,
            sentry: SentryConfig::default(),
            log_format: LogFormat::Text,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(config.is_https());
    }
}
