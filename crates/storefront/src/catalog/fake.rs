//! In-memory [`CatalogApi`] for service tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use itu_shop_core::{Category, Money, ProductCode};
use rust_decimal::Decimal;

use super::types::{CategoryRef, Product, ProductPage, ProductQuery};
use super::{CatalogApi, CatalogError};

#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub categories: Vec<Category>,
    pub pages: Vec<Vec<Product>>,
    pub reported_total_pages: Option<u32>,
    pub page_totals: Vec<u32>,
    pub products: HashMap<String, Product>,
    pub failing_codes: HashSet<String>,
    pub fail_all: AtomicBool,
    pub delay: Option<Duration>,
    pub search_calls: AtomicUsize,
    pub product_calls: AtomicUsize,
    pub category_calls: AtomicUsize,
}

impl FakeCatalog {
    pub(crate) fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub(crate) fn with_pages(mut self, pages: Vec<Vec<Product>>) -> Self {
        for product in pages.iter().flatten() {
            self.products
                .insert(product.code.as_str().to_string(), product.clone());
        }
        self.pages = pages;
        self
    }

    /// `totalPages` reported by each page in turn, overriding the default.
    pub(crate) fn with_page_totals(mut self, totals: Vec<u32>) -> Self {
        self.page_totals = totals;
        self
    }

    pub(crate) fn with_product(mut self, product: Product) -> Self {
        self.products
            .insert(product.code.as_str().to_string(), product);
        self
    }

    pub(crate) fn failing_code(mut self, code: &str) -> Self {
        self.failing_codes.insert(code.to_string());
        self
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn unavailable() -> CatalogError {
        CatalogError::Transport {
            message: "connection refused".to_string(),
            timed_out: false,
        }
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }

        let index = usize::try_from(query.page).unwrap_or(usize::MAX);
        let products = self.pages.get(index).cloned().unwrap_or_default();
        let total_pages = self
            .page_totals
            .get(index)
            .copied()
            .or(self.reported_total_pages)
            .unwrap_or_else(|| u32::try_from(self.pages.len()).unwrap_or(u32::MAX));

        Ok(ProductPage {
            total_results: self.pages.iter().map(|p| p.len() as u64).sum(),
            products,
            current_page: query.page,
            page_size: 12,
            total_pages,
        })
    }

    async fn get_product(&self, code: &ProductCode) -> Result<Product, CatalogError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) || self.failing_codes.contains(code.as_str()) {
            return Err(Self::unavailable());
        }
        self.products
            .get(code.as_str())
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("Product not found: {code}")))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.categories.clone())
    }
}

/// A CHF product with an optional URL and structural category.
#[allow(clippy::unwrap_used)]
pub(crate) fn product(
    code: &str,
    price: &str,
    url: Option<&str>,
    category: Option<&str>,
) -> Product {
    let price = Money::new(Decimal::from_str(price).unwrap(), "CHF");
    Product {
        code: ProductCode::parse(code).unwrap(),
        name: format!("Product {code}"),
        url: url.map(String::from),
        formatted_price: price.display(),
        price,
        stock_status: "inStock".to_string(),
        image_url: Some(format!("https://img.example.test/{code}.jpg")),
        categories: category
            .map(|c| {
                vec![CategoryRef {
                    code: c.to_string(),
                    name: None,
                }]
            })
            .unwrap_or_default(),
    }
}
