//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_CLIENT_ID` - OAuth client-credentials client ID
//! - `CATALOG_CLIENT_SECRET` - OAuth client-credentials client secret
//! - `CATALOG_TOKEN_URL` - OAuth token endpoint
//! - `CATALOG_API_BASE_URL` - Catalog REST base URL (e.g. `https://host/occ/v2/itu`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `CATALOG_IMAGE_BASE_URL` - Prefix for relative image URLs (default: origin of the API base URL)
//! - `CATALOG_ID` - Catalog whose categories are listed (default: ituProductCatalog)
//! - `CATALOG_VERSION` - Catalog version (default: Online)
//! - `CATALOG_EXCLUDED_CATEGORIES` - Comma-separated non-product category names (default: Brands)
//! - `CATALOG_REQUEST_TIMEOUT_SECS` - Upstream request timeout (default: 15)
//! - `CATALOG_MAX_CRAWL_PAGES` - Page ceiling for the category crawl (default: 200)
//! - `CATALOG_CRAWL_TIMEOUT_SECS` - Wall-clock limit for the category crawl (default: 120)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.1)
//! - `LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Results per page on the upstream search endpoint.
pub const SEARCH_PAGE_SIZE: u32 = 12;

/// Lifetime of the cached category list and of the cached category counts.
pub const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
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

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
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
    /// Upstream catalog configuration
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
    /// Log output format
    pub log_format: LogFormat,
}

/// Upstream catalog configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CatalogConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (server-side only)
    pub client_secret: SecretString,
    /// OAuth token endpoint
    pub token_url: String,
    /// REST API base, without trailing slash
    pub api_base_url: String,
    /// Prefix for relative image URLs, without trailing slash
    pub image_base_url: String,
    /// Catalog whose category tree is listed
    pub catalog_id: String,
    /// Catalog version whose category tree is listed
    pub catalog_version: String,
    /// Display names of categories that are not product groupings
    pub excluded_categories: Vec<String>,
    /// Per-request timeout for upstream calls
    pub request_timeout: Duration,
    /// Hard page ceiling for the category crawl
    pub max_crawl_pages: u32,
    /// Wall-clock limit for the category crawl
    pub crawl_timeout: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("image_base_url", &self.image_base_url)
            .field("catalog_id", &self.catalog_id)
            .field("catalog_version", &self.catalog_version)
            .field("excluded_categories", &self.excluded_categories)
            .field("request_timeout", &self.request_timeout)
            .field("max_crawl_pages", &self.max_crawl_pages)
            .field("crawl_timeout", &self.crawl_timeout)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the client secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");

        let catalog = CatalogConfig::from_env()?;

        let log_format = match get_env_or_default("LOG_FORMAT", "pretty").as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            base_url,
            catalog,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
            log_format,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = get_required_url("CATALOG_API_BASE_URL")?;
        let image_base_url = match get_optional_env("CATALOG_IMAGE_BASE_URL") {
            Some(value) => value.trim_end_matches('/').to_string(),
            None => origin_of(&api_base_url, "CATALOG_API_BASE_URL")?,
        };

        let client_secret = get_validated_secret("CATALOG_CLIENT_SECRET")?;

        Ok(Self {
            client_id: get_required_env("CATALOG_CLIENT_ID")?,
            client_secret,
            token_url: get_required_url("CATALOG_TOKEN_URL")?,
            api_base_url,
            image_base_url,
            catalog_id: get_env_or_default("CATALOG_ID", "ituProductCatalog"),
            catalog_version: get_env_or_default("CATALOG_VERSION", "Online"),
            excluded_categories: parse_list(&get_env_or_default(
                "CATALOG_EXCLUDED_CATEGORIES",
                "Brands",
            )),
            request_timeout: Duration::from_secs(get_parsed_or_default(
                "CATALOG_REQUEST_TIMEOUT_SECS",
                15,
            )?),
            max_crawl_pages: get_parsed_or_default("CATALOG_MAX_CRAWL_PAGES", 200)?,
            crawl_timeout: Duration::from_secs(get_parsed_or_default(
                "CATALOG_CRAWL_TIMEOUT_SECS",
                120,
            )?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable. Blank values count as missing.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required absolute URL, without trailing slash.
fn get_required_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(value.trim_end_matches('/').to_string())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// `scheme://host[:port]` of a URL.
fn origin_of(url: &str, key: &str) -> Result<String, ConfigError> {
    let parsed =
        Url::parse(url).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(parsed
        .origin()
        .ascii_serialization()
        .trim_end_matches('/')
        .to_string())
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a secret is not a placeholder.
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

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
