//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOKO_CATALOG_URL` - Product catalog endpoint (GET)
//! - `SOKO_ORDERS_URL` - Order submission endpoint (POST)
//! - `SOKO_API_KEY` - API key sent as `x-api-key` on every upstream call
//! - `SOKO_WHATSAPP_CONTACT` - WhatsApp number orders are handed off to
//!
//! ## Optional
//! - `SOKO_HOST` - Bind address (default: 127.0.0.1)
//! - `SOKO_PORT` - Listen port (default: 3000)
//! - `SOKO_SESSION_URL` - Session lookup endpoint; tokens are used as-is when unset
//! - `SOKO_STORAGE_DIR` - Directory for persisted carts (in-memory when unset)
//! - `SOKO_CATALOG_FALLBACK` - `default` or `strict` (default: default)
//! - `SOKO_CATALOG_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SOKO_CATALOG_MAX_ATTEMPTS` - Fetch attempts on transient failure (default: 3)
//! - `SOKO_HTTP_TIMEOUT_SECS` - Upstream request timeout (default: 10)
//! - `SOKO_CURRENCY` - ISO 4217 store currency (default: GHS)
//! - `SOKO_CHECKOUT_HANDOFF` - `whatsapp` or `parent_frame` (default: whatsapp)
//! - `SOKO_LOG_FORMAT` - `json` for JSON log lines (read by the binary)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use soko_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Upstream API configuration
    pub api: ApiConfig,
    /// Catalog fetch and fallback behavior
    pub catalog: CatalogConfig,
    /// Checkout handoff configuration
    pub checkout: CheckoutConfig,
    /// Directory for persisted carts; `None` keeps carts in memory
    pub storage_dir: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced by Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Upstream API configuration shared by the catalog, order and session clients.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ApiConfig {
    /// Product catalog endpoint
    pub catalog_url: Url,
    /// Order submission endpoint
    pub orders_url: Url,
    /// Session lookup endpoint (token is appended as a path segment)
    pub session_url: Option<Url>,
    /// API key sent on every upstream call
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("catalog_url", &self.catalog_url.as_str())
            .field("orders_url", &self.orders_url.as_str())
            .field("session_url", &self.session_url.as_ref().map(Url::as_str))
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What to serve when the catalog service cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Serve the last good catalog, else the built-in default catalog.
    #[default]
    DefaultCatalog,
    /// Surface the failure.
    Strict,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::DefaultCatalog),
            "strict" => Ok(Self::Strict),
            other => Err(format!("expected `default` or `strict`, got `{other}`")),
        }
    }
}

/// Catalog fetch configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Behavior on transport failure
    pub fallback: FallbackPolicy,
    /// How long a fetched catalog is served from cache
    pub cache_ttl: Duration,
    /// Attempts per fetch on transient failure (at least 1)
    pub max_attempts: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::DefaultCatalog,
            cache_ttl: Duration::from_secs(300),
            max_attempts: 3,
        }
    }
}

/// How a confirmed order is handed off to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffKind {
    /// Redirect to a WhatsApp chat with an order summary.
    #[default]
    WhatsApp,
    /// Return a message for the embedding page to post to its parent frame.
    ParentFrame,
}

impl FromStr for HandoffKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(Self::WhatsApp),
            "parent_frame" => Ok(Self::ParentFrame),
            other => Err(format!("expected `whatsapp` or `parent_frame`, got `{other}`")),
        }
    }
}

/// Checkout configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Handoff strategy after a confirmed order
    pub handoff: HandoffKind,
    /// WhatsApp number in international format, digits only
    pub whatsapp_contact: String,
    /// Store currency
    pub currency: CurrencyCode,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("SOKO_HOST", "127.0.0.1")?;
        let port = parse_env("SOKO_PORT", "3000")?;

        let api = ApiConfig {
            catalog_url: get_required_url("SOKO_CATALOG_URL")?,
            orders_url: get_required_url("SOKO_ORDERS_URL")?,
            session_url: get_optional_env("SOKO_SESSION_URL")
                .map(|value| parse_url("SOKO_SESSION_URL", &value))
                .transpose()?,
            api_key: get_validated_secret("SOKO_API_KEY")?,
            timeout: Duration::from_secs(parse_env("SOKO_HTTP_TIMEOUT_SECS", "10")?),
        };

        let catalog = CatalogConfig {
            fallback: parse_env("SOKO_CATALOG_FALLBACK", "default")?,
            cache_ttl: Duration::from_secs(parse_env("SOKO_CATALOG_TTL_SECS", "300")?),
            max_attempts: parse_env::<u32>("SOKO_CATALOG_MAX_ATTEMPTS", "3")?.max(1),
        };

        let checkout = CheckoutConfig {
            handoff: parse_env("SOKO_CHECKOUT_HANDOFF", "whatsapp")?,
            whatsapp_contact: normalize_contact(
                "SOKO_WHATSAPP_CONTACT",
                &get_required_env("SOKO_WHATSAPP_CONTACT")?,
            )?,
            currency: parse_env("SOKO_CURRENCY", "GHS")?,
        };

        Ok(Self {
            host,
            port,
            api,
            catalog,
            checkout,
            storage_dir: get_optional_env("SOKO_STORAGE_DIR").map(PathBuf::from),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute http(s) URL.
fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get a required URL environment variable.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    parse_url(key, &get_required_env(key)?)
}

/// Strip formatting from a phone number, keeping the digits wa.me expects.
fn normalize_contact(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = body
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.len() < 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "expected an international phone number such as +234 800 000 0000".to_string(),
        ));
    }
    Ok(digits)
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

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the catalog service."
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
