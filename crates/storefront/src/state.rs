//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use itu_shop_core::{Category, CategoryCounts, CredentialToken};

use crate::cache::MokaStore;
use crate::catalog::{CatalogApi, CatalogClient, CatalogError, CredentialCache, OAuthTokenIssuer};
use crate::config::{CATEGORY_CACHE_TTL, StorefrontConfig};
use crate::middleware::session::SESSION_EXPIRY_SECONDS;
use crate::services::{AggregatorSettings, CartPricer, CartStore, CategoryAggregator};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog client, the category aggregator, the cart store and the pricer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogClient,
    categories: CategoryAggregator,
    carts: CartStore,
    pricer: CartPricer,
}

impl AppState {
    /// Create a new application state, wiring every service to one catalog
    /// client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if an HTTP client cannot be built or
    /// the catalog base URL is invalid.
    pub fn new(config: StorefrontConfig) -> Result<Self, CatalogError> {
        let catalog_config = &config.catalog;

        let issuer = OAuthTokenIssuer::new(&catalog_config.token_url, catalog_config.request_timeout)?;
        let credentials = CredentialCache::new(
            Arc::new(issuer),
            Arc::new(MokaStore::<CredentialToken>::new(16)),
        );
        let catalog = CatalogClient::new(catalog_config, credentials)?;
        let api: Arc<dyn CatalogApi> = Arc::new(catalog.clone());

        let categories = CategoryAggregator::new(
            api.clone(),
            Arc::new(MokaStore::<Vec<Category>>::new(4)),
            Arc::new(MokaStore::<CategoryCounts>::new(4)),
            AggregatorSettings {
                excluded_categories: catalog_config.excluded_categories.clone(),
                cache_ttl: CATEGORY_CACHE_TTL,
                max_pages: catalog_config.max_crawl_pages,
                crawl_timeout: catalog_config.crawl_timeout,
            },
        );

        let carts = CartStore::new(Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs()));
        let pricer = CartPricer::new(api);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                categories,
                carts,
                pricer,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the upstream catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the category aggregator.
    #[must_use]
    pub fn categories(&self) -> &CategoryAggregator {
        &self.inner.categories
    }

    /// Get a reference to the per-session cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the cart pricer.
    #[must_use]
    pub fn pricer(&self) -> &CartPricer {
        &self.inner.pricer
    }
}
