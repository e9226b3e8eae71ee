//! Category list and per-category product counts.
//!
//! Counts come from crawling every search page once and attributing each
//! product to a category: by its structural category reference when the
//! upstream sends one, else by the normalized category segment of its URL.
//! The category list and the count map are cached under independent keys.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use itu_shop_core::{Category, CategoryCounts, NormalizedSlug};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::cache::ExpiringStore;
use crate::catalog::{CatalogApi, CatalogError, Product, ProductQuery};

const CATEGORIES_KEY: &str = "catalog:categories";
const COUNTS_KEY: &str = "catalog:category_counts";

/// Tuning for the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Display names filtered out of every category list, compared by
    /// normalized slug.
    pub excluded_categories: Vec<String>,
    /// Lifetime of each cache entry.
    pub cache_ttl: Duration,
    /// Hard page ceiling for one crawl.
    pub max_pages: u32,
    /// Wall-clock limit for one crawl.
    pub crawl_timeout: Duration,
}

/// A category and how many products it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// Category id.
    pub id: String,
    /// Category display name.
    pub name: String,
    /// Number of products attributed to the category.
    pub count: u64,
}

/// Category list joined with counts, as shown in navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOverview {
    /// Categories with counts, in catalog order.
    pub categories: Vec<CategoryCount>,
    /// Every product seen by the crawl.
    pub total_products: u64,
    /// Whether stale or missing data is being shown after an upstream failure.
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Current,
    Stale,
}

/// Builds and caches category lists and counts.
#[derive(Clone)]
pub struct CategoryAggregator {
    inner: Arc<CategoryAggregatorInner>,
}

struct CategoryAggregatorInner {
    catalog: Arc<dyn CatalogApi>,
    categories: Arc<dyn ExpiringStore<Vec<Category>>>,
    counts: Arc<dyn ExpiringStore<CategoryCounts>>,
    settings: AggregatorSettings,
    /// Serialises count refreshes so one crawl serves every waiting caller.
    refresh_guard: Mutex<()>,
    last_categories: RwLock<Option<Vec<Category>>>,
    last_counts: RwLock<Option<CategoryCounts>>,
}

impl CategoryAggregator {
    /// Create an aggregator reading from `catalog` and caching in the given
    /// stores.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        categories: Arc<dyn ExpiringStore<Vec<Category>>>,
        counts: Arc<dyn ExpiringStore<CategoryCounts>>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(CategoryAggregatorInner {
                catalog,
                categories,
                counts,
                settings,
                refresh_guard: Mutex::new(()),
                last_categories: RwLock::new(None),
                last_counts: RwLock::new(None),
            }),
        }
    }

    /// Product categories, excluded groupings removed.
    ///
    /// Served from cache for the configured TTL. If the upstream fails, the
    /// last good list is returned.
    ///
    /// # Errors
    ///
    /// Returns the upstream error when no list has ever been loaded.
    pub async fn get_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.load_categories().await.map(|(categories, _)| categories)
    }

    /// Product counts from the last full crawl.
    ///
    /// Concurrent callers that find the cache expired wait for a single
    /// crawl. If the crawl fails, the last good counts are returned.
    ///
    /// # Errors
    ///
    /// Returns the upstream error when no counts have ever been computed.
    pub async fn get_count_map(&self) -> Result<CategoryCounts, CatalogError> {
        self.load_counts().await.map(|(counts, _)| counts)
    }

    /// Categories joined with their counts.
    ///
    /// Never fails: upstream trouble degrades to stale data, or an empty list
    /// with `degraded` set.
    #[instrument(skip(self))]
    pub async fn get_category_counts(&self) -> CategoryOverview {
        let categories = match self.load_categories().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Category list unavailable");
                return CategoryOverview {
                    degraded: true,
                    ..CategoryOverview::default()
                };
            }
        };

        let counts = match self.load_counts().await {
            Ok(loaded) => Some(loaded),
            Err(e) => {
                warn!(error = %e, "Category counts unavailable");
                None
            }
        };

        let degraded = categories.1 == Freshness::Stale
            || counts
                .as_ref()
                .is_none_or(|(_, freshness)| *freshness == Freshness::Stale);
        let counts = counts.map(|(counts, _)| counts).unwrap_or_default();

        CategoryOverview {
            categories: categories
                .0
                .into_iter()
                .map(|category| CategoryCount {
                    count: counts.for_category(&category.id),
                    id: category.id,
                    name: category.display_name,
                })
                .collect(),
            total_products: counts.total(),
            degraded,
        }
    }

    async fn load_categories(&self) -> Result<(Vec<Category>, Freshness), CatalogError> {
        if let Some(categories) = self.inner.categories.get(CATEGORIES_KEY).await {
            debug!("Category list cache hit");
            return Ok((categories, Freshness::Current));
        }

        match self.fetch_categories().await {
            Ok(categories) => {
                self.inner
                    .categories
                    .set(CATEGORIES_KEY, categories.clone(), self.inner.settings.cache_ttl)
                    .await;
                *self.inner.last_categories.write().await = Some(categories.clone());
                Ok((categories, Freshness::Current))
            }
            Err(e) => match self.inner.last_categories.read().await.clone() {
                Some(stale) => {
                    warn!(error = %e, "Serving stale category list");
                    Ok((stale, Freshness::Stale))
                }
                None => Err(e),
            },
        }
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        // Same join key as URL attribution, so "Brands (3)" is still Brands
        let excluded: HashSet<NormalizedSlug> = self
            .inner
            .settings
            .excluded_categories
            .iter()
            .map(|name| NormalizedSlug::new(name))
            .filter(|slug| !slug.is_empty())
            .collect();
        let categories: Vec<Category> = self
            .inner
            .catalog
            .list_categories()
            .await?
            .into_iter()
            .filter(|c| !excluded.contains(&c.slug()))
            .collect();

        info!(count = categories.len(), "Loaded category list");
        Ok(categories)
    }

    async fn load_counts(&self) -> Result<(CategoryCounts, Freshness), CatalogError> {
        if let Some(counts) = self.inner.counts.get(COUNTS_KEY).await {
            debug!("Category counts cache hit");
            return Ok((counts, Freshness::Current));
        }

        let _guard = self.inner.refresh_guard.lock().await;

        // Another caller may have finished the crawl while we waited
        if let Some(counts) = self.inner.counts.get(COUNTS_KEY).await {
            return Ok((counts, Freshness::Current));
        }

        match self.refresh_counts().await {
            Ok(counts) => {
                self.inner
                    .counts
                    .set(COUNTS_KEY, counts.clone(), self.inner.settings.cache_ttl)
                    .await;
                *self.inner.last_counts.write().await = Some(counts.clone());
                Ok((counts, Freshness::Current))
            }
            Err(e) => match self.inner.last_counts.read().await.clone() {
                Some(stale) => {
                    warn!(error = %e, "Serving stale category counts");
                    Ok((stale, Freshness::Stale))
                }
                None => Err(e),
            },
        }
    }

    async fn refresh_counts(&self) -> Result<CategoryCounts, CatalogError> {
        let (categories, _) = self.load_categories().await?;
        let timeout = self.inner.settings.crawl_timeout;

        tokio::time::timeout(timeout, self.crawl(&categories))
            .await
            .map_err(|_| CatalogError::Transport {
                message: format!("Category crawl exceeded {}s", timeout.as_secs_f32()),
                timed_out: true,
            })?
    }

    /// Crawl every search page and attribute each product to a category.
    #[instrument(skip(self, categories), fields(categories = categories.len()))]
    async fn crawl(&self, categories: &[Category]) -> Result<CategoryCounts, CatalogError> {
        let index = CategoryIndex::new(categories);
        let mut counts = CategoryCounts::with_categories(categories);
        let max_pages = self.inner.settings.max_pages;

        let mut page = 0;
        let mut total_pages = 1;
        while page < total_pages {
            if page >= max_pages {
                warn!(
                    max_pages,
                    total_pages, "Category crawl hit its page ceiling; counts are truncated"
                );
                break;
            }

            let result = self
                .inner
                .catalog
                .search_products(&ProductQuery::page(page))
                .await?;
            // Re-read every page; the upstream may change its mind mid-crawl
            total_pages = result.total_pages;

            if result.products.is_empty() {
                debug!(page, "Empty page ends the crawl");
                break;
            }

            for product in &result.products {
                match index.attribute(product) {
                    Some(id) => counts.record_match(id),
                    None => {
                        warn!(
                            code = %product.code,
                            url = product.url.as_deref().unwrap_or_default(),
                            "Product category segment matches no known category"
                        );
                        counts.record_unmatched();
                    }
                }
            }

            page += 1;
        }

        info!(
            pages = page,
            total = counts.total(),
            unmatched = counts.unmatched(),
            "Category crawl finished"
        );
        Ok(counts)
    }
}

/// Lookup from category ids and slugs back to category ids.
struct CategoryIndex<'a> {
    ids: HashSet<&'a str>,
    by_slug: HashMap<NormalizedSlug, &'a str>,
}

impl<'a> CategoryIndex<'a> {
    fn new(categories: &'a [Category]) -> Self {
        let ids = categories.iter().map(|c| c.id.as_str()).collect();
        let by_slug = categories
            .iter()
            .filter_map(|c| {
                let slug = c.slug();
                (!slug.is_empty()).then_some((slug, c.id.as_str()))
            })
            .collect();
        Self { ids, by_slug }
    }

    /// Category id for a product, structural reference first.
    fn attribute(&self, product: &Product) -> Option<&'a str> {
        if let Some(id) = product
            .categories
            .iter()
            .find_map(|c| self.ids.get(c.code.as_str()).copied())
        {
            return Some(id);
        }

        let segment = url_category_segment(product.url.as_deref()?)?;
        let decoded = urlencoding::decode(segment).ok()?;
        let slug = NormalizedSlug::new(&decoded);
        if slug.is_empty() {
            return None;
        }
        self.by_slug.get(&slug).copied()
    }
}

/// Category segment of a product URL.
///
/// For `/…/<category>/<product-name>/p/<code>` this is the segment two before
/// the `p` marker; for paths without the marker, the first segment.
fn url_category_segment(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.iter().rposition(|s| *s == "p") {
        Some(marker) if marker >= 2 => segments.get(marker - 2).copied(),
        Some(_) => None,
        None => segments.first().copied(),
    }
}
