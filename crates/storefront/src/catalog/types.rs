//! Domain types for catalog reads.
//!
//! These are separate from the raw upstream JSON shapes, which live in
//! `conversions`.

use itu_shop_core::{Money, ProductCode};
use serde::{Deserialize, Serialize};

// =============================================================================
// Product Types
// =============================================================================

/// A catalog product as shown to shoppers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product code (the catalog's primary key).
    pub code: ProductCode,
    /// Display name.
    pub name: String,
    /// Upstream product page path, e.g. `/Accessories/Mouse/p/1234`.
    pub url: Option<String>,
    /// Unit price.
    pub price: Money,
    /// Upstream-formatted unit price.
    pub formatted_price: String,
    /// Stock level status, e.g. `inStock`.
    pub stock_status: String,
    /// Absolute URL of the primary product image.
    pub image_url: Option<String>,
    /// Categories the upstream attached to the product.
    pub categories: Vec<CategoryRef>,
}

/// Structural category reference carried on a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    /// Category identifier.
    pub code: String,
    /// Category display name, if supplied.
    pub name: Option<String>,
}

// =============================================================================
// Search Types
// =============================================================================

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Products on this page.
    pub products: Vec<Product>,
    /// Zero-based page index.
    pub current_page: u32,
    /// Page size used by the upstream.
    pub page_size: u32,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of matching products.
    pub total_results: u64,
}

/// Search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Zero-based page index.
    pub page: u32,
    /// Free-text query.
    pub text: Option<String>,
    /// Category id filter.
    pub category: Option<String>,
}

impl ProductQuery {
    /// Unfiltered query for `page`.
    #[must_use]
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    /// Upstream `query` parameter, if any filter is set.
    ///
    /// A category filter uses the `<text>:relevance:allCategories:<id>` form.
    #[must_use]
    pub fn upstream_query(&self) -> Option<String> {
        let text = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        match (text, category) {
            (text, Some(category)) => Some(format!(
                "{}:relevance:allCategories:{category}",
                text.unwrap_or_default()
            )),
            (Some(text), None) => Some(text.to_string()),
            (None, None) => None,
        }
    }
}
