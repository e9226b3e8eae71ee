//! Upstream catalog access.
//!
//! # Architecture
//!
//! - [`CredentialCache`] memoizes the client-credentials bearer token in an
//!   injected [`ExpiringStore`](crate::cache::ExpiringStore)
//! - [`CatalogClient`] performs product search, product lookup and category
//!   listing over the upstream REST API with that token
//! - Catalog responses are never cached here; prices must be current
//!
//! Services depend on the [`CatalogApi`] trait rather than the concrete
//! client so they can be exercised against in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use itu_shop_storefront::catalog::{CatalogApi, CatalogClient, ProductQuery};
//!
//! let client = CatalogClient::new(&config.catalog, credentials)?;
//! let page = client.search_products(&ProductQuery::page(0)).await?;
//! let product = client.get_product(&page.products[0].code).await?;
//! ```

mod auth;
mod client;
mod conversions;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use auth::{CredentialCache, IssuedToken, OAuthTokenIssuer, TokenIssuer};
pub use client::CatalogClient;
pub use types::*;

use async_trait::async_trait;
use itu_shop_core::{Category, ProductCode};
use thiserror::Error;

/// Errors that can occur when talking to the upstream catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Credential exchange failed or returned no token.
    #[error("Credential exchange failed: {0}")]
    Auth(String),

    /// Network failure or timeout.
    #[error("Transport error: {message}")]
    Transport {
        /// Underlying error description.
        message: String,
        /// Whether the request hit its timeout.
        timed_out: bool,
    },

    /// Resource does not exist upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered with an unexpected status.
    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Client could not be constructed from configuration.
    #[error("Catalog configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// Read access to the upstream catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of products, `page_size` fixed by the upstream contract.
    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError>;

    /// A single product by code.
    ///
    /// A delisted product is [`CatalogError::NotFound`], distinct from
    /// transport failures.
    async fn get_product(&self, code: &ProductCode) -> Result<Product, CatalogError>;

    /// All categories of the configured catalog version, flattened.
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;
}
