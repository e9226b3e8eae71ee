//! Catalog categories and per-category product counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::slug::NormalizedSlug;

/// A product category as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Catalog category identifier.
    pub id: String,
    /// Human-readable label.
    pub display_name: String,
}

impl Category {
    /// Create a category.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Join key between this category and product URL segments.
    #[must_use]
    pub fn slug(&self) -> NormalizedSlug {
        NormalizedSlug::new(&self.display_name)
    }
}

/// Key into a [`CategoryCounts`] map.
///
/// `AllProducts` is a separate variant rather than a reserved string, so no
/// category id or slug can ever collide with it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CountKey {
    /// Every product seen during the crawl.
    AllProducts,
    /// Products attributed to a category, by category id.
    Category(String),
}

/// Product counts built from one full catalog crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: BTreeMap<CountKey, u64>,
    unmatched: u64,
}

impl CategoryCounts {
    /// Start a count map with every category at zero.
    #[must_use]
    pub fn with_categories<'a>(categories: impl IntoIterator<Item = &'a Category>) -> Self {
        let mut counts = BTreeMap::new();
        counts.insert(CountKey::AllProducts, 0);
        for category in categories {
            counts.insert(CountKey::Category(category.id.clone()), 0);
        }
        Self {
            counts,
            unmatched: 0,
        }
    }

    /// Record a product attributed to `category_id`.
    pub fn record_match(&mut self, category_id: &str) {
        *self.counts.entry(CountKey::AllProducts).or_insert(0) += 1;
        *self
            .counts
            .entry(CountKey::Category(category_id.to_owned()))
            .or_insert(0) += 1;
    }

    /// Record a product whose category could not be resolved.
    pub fn record_unmatched(&mut self) {
        *self.counts.entry(CountKey::AllProducts).or_insert(0) += 1;
        self.unmatched += 1;
    }

    /// Count stored under `key`, zero if absent.
    #[must_use]
    pub fn get(&self, key: &CountKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Count for a category id.
    #[must_use]
    pub fn for_category(&self, category_id: &str) -> u64 {
        self.get(&CountKey::Category(category_id.to_owned()))
    }

    /// The "all products" sentinel count.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.get(&CountKey::AllProducts)
    }

    /// Products that matched no known category.
    #[must_use]
    pub const fn unmatched(&self) -> u64 {
        self.unmatched
    }

    /// Sum of all per-category counts, excluding the sentinel.
    #[must_use]
    pub fn matched(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(key, _)| matches!(key, CountKey::Category(_)))
            .map(|(_, count)| count)
            .sum()
    }

    /// Iterate per-category counts, excluding the sentinel.
    pub fn categories(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().filter_map(|(key, count)| match key {
            CountKey::Category(id) => Some((id.as_str(), *count)),
            CountKey::AllProducts => None,
        })
    }
}
