//! Theme configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WEBSTORE_API_BASE_URL` - Origin of the storefront REST API
//!
//! ## Optional
//! - `WEBSTORE_LOCALE` - BCP 47 locale tag for display (default: en-US)
//! - `WEBSTORE_CURRENCY` - ISO 4217 currency code (default: USD)
//! - `WEBSTORE_CURRENCY_SYMBOL` - Symbol prefixed to amounts (default: $)
//! - `WEBSTORE_CART_COUNT_TTL_MS` - Cart count cache TTL (default: 5000)
//! - `WEBSTORE_PRODUCT_CACHE_TTL_SECS` - Product cache TTL (default: 300)
//! - `WEBSTORE_PRICE_POLL_INTERVAL_SECS` - Checkout poll cadence (default: 45)
//! - `WEBSTORE_PRICE_POLL_MAX_ATTEMPTS` - Checkout poll cap (default: 20)

use std::time::Duration;

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

/// Theme engine configuration.
#[derive(Debug, Clone)]
pub struct ThemeConfig {
    /// Origin of the storefront REST API (e.g. `https://shop.example.com`)
    pub api_base_url: Url,
    /// BCP 47 locale tag used for display formatting
    pub locale: String,
    /// ISO 4217 currency code
    pub currency: String,
    /// Currency symbol prefixed to formatted amounts
    pub currency_symbol: String,
    /// TTL for the cached cart item count
    pub cart_count_ttl: Duration,
    /// TTL for cached product detail lookups
    pub product_cache_ttl: Duration,
    /// Cadence of the checkout price poller
    pub price_poll_interval: Duration,
    /// Number of polls after which the checkout poller self-terminates
    pub price_poll_max_attempts: u32,
}

impl ThemeConfig {
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

        let api_base_url = get_required_env("WEBSTORE_API_BASE_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("WEBSTORE_API_BASE_URL".to_string(), e.to_string())
            })?;

        let cart_count_ttl_ms = parse_env_or_default("WEBSTORE_CART_COUNT_TTL_MS", 5000_u64)?;
        let product_cache_ttl_secs =
            parse_env_or_default("WEBSTORE_PRODUCT_CACHE_TTL_SECS", 300_u64)?;
        let price_poll_interval_secs =
            parse_env_or_default("WEBSTORE_PRICE_POLL_INTERVAL_SECS", 45_u64)?;
        let price_poll_max_attempts =
            parse_env_or_default("WEBSTORE_PRICE_POLL_MAX_ATTEMPTS", 20_u32)?;

        Ok(Self {
            api_base_url,
            locale: get_env_or_default("WEBSTORE_LOCALE", "en-US"),
            currency: get_env_or_default("WEBSTORE_CURRENCY", "USD"),
            currency_symbol: get_env_or_default("WEBSTORE_CURRENCY_SYMBOL", "$"),
            cart_count_ttl: Duration::from_millis(cart_count_ttl_ms),
            product_cache_ttl: Duration::from_secs(product_cache_ttl_secs),
            price_poll_interval: Duration::from_secs(price_poll_interval_secs),
            price_poll_max_attempts,
        })
    }

    /// Build a configuration with defaults for a given API origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not a valid URL.
    pub fn for_origin(base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = base_url.parse::<Url>().map_err(|e| {
            ConfigError::InvalidEnvVar("WEBSTORE_API_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_base_url,
            locale: "en-US".to_string(),
            currency: "USD".to_string(),
            currency_symbol: "$".to_string(),
            cart_count_ttl: Duration::from_millis(5000),
            product_cache_ttl: Duration::from_secs(300),
            price_poll_interval: Duration::from_secs(45),
            price_poll_max_attempts: 20,
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

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
