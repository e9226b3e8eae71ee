//! REST client for the upstream catalog.
//!
//! Uses `reqwest` 0.13 with a per-request timeout. Every request carries a
//! bearer token from the [`CredentialCache`] and `Cache-Control: no-cache`.

use std::sync::Arc;

use async_trait::async_trait;
use itu_shop_core::{Category, ProductCode};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::auth::CredentialCache;
use super::conversions::{
    WireCatalogVersion, WireProduct, WireSearchPage, convert_product, convert_search_page,
    flatten_categories,
};
use super::types::{Product, ProductPage, ProductQuery};
use super::{CatalogApi, CatalogError};
use crate::config::{CatalogConfig, SEARCH_PAGE_SIZE};

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the upstream catalog REST API.
///
/// Responses are not cached; callers that need caching layer it themselves.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    api_base_url: Url,
    image_base_url: String,
    catalog_id: String,
    catalog_version: String,
    client_id: String,
    client_secret: SecretString,
    credentials: CredentialCache,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: &CatalogConfig, credentials: CredentialCache) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CatalogError::Config(format!("Failed to build HTTP client: {e}")))?;

        // Trailing slash so relative joins keep the site path
        let api_base_url = Url::parse(&format!("{}/", config.api_base_url.trim_end_matches('/')))
            .map_err(|e| CatalogError::Config(format!("Invalid catalog base URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                api_base_url,
                image_base_url: config.image_base_url.clone(),
                catalog_id: config.catalog_id.clone(),
                catalog_version: config.catalog_version.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                credentials,
            }),
        })
    }

    /// Obtain a bearer token, issuing one if needed.
    ///
    /// Used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Auth`] if the exchange fails.
    pub async fn token(&self) -> Result<SecretString, CatalogError> {
        self.inner
            .credentials
            .get_token(&self.inner.client_id, &self.inner.client_secret)
            .await
    }

    /// Build an endpoint URL from percent-encoded path segments and query pairs.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let mut url = self.inner.api_base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| CatalogError::Config("Catalog base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Execute an authenticated GET and parse the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        let token = self.token().await?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| CatalogError::Auth(format!("Token is not a valid header value: {e}")))?;

        let response = self
            .inner
            .client
            .get(url.as_str())
            .header(AUTHORIZATION, bearer)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // Token revoked or rotated upstream; force a fresh exchange next time
            self.inner.credentials.invalidate(&self.inner.client_id).await;
            return Err(CatalogError::Auth(
                "Catalog rejected the bearer token".to_string(),
            ));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url.path().to_string()));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message: response_text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            CatalogError::Parse(e)
        })
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    #[instrument(skip(self), fields(page = query.page))]
    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let current_page = query.page.to_string();
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let upstream_query = query.upstream_query();

        let mut params = vec![
            ("currentPage", current_page.as_str()),
            ("pageSize", page_size.as_str()),
            ("fields", "DEFAULT"),
        ];
        if let Some(q) = upstream_query.as_deref() {
            params.push(("query", q));
        }

        let url = self.endpoint(&["products", "search"], &params)?;
        let wire: WireSearchPage = self.get_json(url).await?;

        let page = convert_search_page(
            wire,
            query.page,
            SEARCH_PAGE_SIZE,
            &self.inner.image_base_url,
        );
        debug!(
            products = page.products.len(),
            total_pages = page.total_pages,
            "Fetched product page"
        );
        Ok(page)
    }

    #[instrument(skip(self), fields(code = %code))]
    async fn get_product(&self, code: &ProductCode) -> Result<Product, CatalogError> {
        let url = self.endpoint(&["products", code.as_str()], &[("fields", "DEFAULT")])?;
        let wire: WireProduct = self.get_json(url).await?;

        // A body without a code is how the upstream reports a delisted product
        convert_product(wire, &self.inner.image_base_url)
            .ok_or_else(|| CatalogError::NotFound(format!("Product not found: {code}")))
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let url = self.endpoint(
            &[
                "catalogs",
                self.inner.catalog_id.as_str(),
                self.inner.catalog_version.as_str(),
            ],
            &[("fields", "DEFAULT")],
        )?;
        let wire: WireCatalogVersion = self.get_json(url).await?;

        let categories = flatten_categories(wire.categories);
        debug!(count = categories.len(), "Fetched categories");
        Ok(categories)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::MokaStore;
    use crate::catalog::auth::{IssuedToken, TokenIssuer};

    struct StaticIssuer;

    #[async_trait]
    impl TokenIssuer for StaticIssuer {
        async fn issue(
            &self,
            _client_id: &str,
            _client_secret: &SecretString,
        ) -> Result<IssuedToken, CatalogError> {
            Ok(IssuedToken {
                access_token: SecretString::from("t".to_string()),
                expires_in: 3600,
            })
        }
    }

    fn client(base: &str) -> CatalogClient {
        let config = CatalogConfig {
            api_base_url: base.to_string(),
            ..crate::config::tests::test_catalog_config()
        };
        let credentials = CredentialCache::new(
            Arc::new(StaticIssuer),
            Arc::new(MokaStore::<itu_shop_core::CredentialToken>::new(4)),
        );
        CatalogClient::new(&config, credentials).unwrap()
    }

    #[test]
    fn test_endpoint_keeps_site_path() {
        let client = client("https://api.example.test/occ/v2/itu");
        let url = client
            .endpoint(&["products", "search"], &[("currentPage", "0")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/occ/v2/itu/products/search?currentPage=0"
        );
    }

    #[test]
    fn test_endpoint_encodes_product_code() {
        let client = client("https://api.example.test/occ/v2/itu/");
        let url = client
            .endpoint(&["products", "A B%1"], &[("fields", "DEFAULT")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/occ/v2/itu/products/A%20B%251?fields=DEFAULT"
        );
    }

    #[test]
    fn test_endpoint_encodes_category_query() {
        let client = client("https://api.example.test/occ/v2/itu");
        let url = client
            .endpoint(
                &["products", "search"],
                &[("query", ":relevance:allCategories:mice")],
            )
            .unwrap();
        assert_eq!(
            url.query(),
            Some("query=%3Arelevance%3AallCategories%3Amice")
        );
    }
}
