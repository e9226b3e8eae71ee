//! Cart pricing against the live catalog.
//!
//! Prices are never stored with the cart. Every read looks each line up in
//! the catalog; lines that cannot be priced are left out of the view and stay
//! in the cart.

use std::sync::Arc;

use futures::future::join_all;
use itu_shop_core::{CartLines, DEFAULT_CURRENCY_ISO, Money, ProductCode};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogApi, CatalogError};

/// A cart line joined with its current catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedCartLine {
    /// Product code.
    pub code: ProductCode,
    /// Current display name.
    pub name: String,
    /// Quantity in the cart.
    pub quantity: u32,
    /// Current unit price.
    pub unit_price: Money,
    /// Upstream-formatted unit price.
    pub formatted_price: String,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// `unit_price × quantity`.
    pub line_total: Money,
    /// Formatted line total.
    pub formatted_line_total: String,
}

/// Priced view of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedCart {
    /// Lines that could be priced, ordered by product code.
    pub lines: Vec<PricedCartLine>,
    /// Sum of the priced line totals.
    pub total: Money,
    /// Formatted grand total.
    pub formatted_total: String,
    /// Sum of the priced line quantities.
    pub item_count: u32,
    /// Codes that could not be priced on this read.
    pub unpriced: Vec<ProductCode>,
}

impl PricedCart {
    /// Whether some cart lines were left out.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.unpriced.is_empty()
    }
}

/// Prices carts by fanning out one catalog lookup per line.
#[derive(Clone)]
pub struct CartPricer {
    catalog: Arc<dyn CatalogApi>,
}

impl CartPricer {
    /// Create a pricer backed by `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    /// Price every line of `cart`.
    ///
    /// A failed or missing lookup drops that line from the result; the cart
    /// itself is never modified.
    #[instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn price_cart(&self, cart: &CartLines) -> PricedCart {
        let lookups = cart.iter().map(|(code, quantity)| async move {
            (code, quantity, self.catalog.get_product(code).await)
        });
        let results = join_all(lookups).await;

        let mut lines = Vec::with_capacity(results.len());
        let mut unpriced = Vec::new();

        for (code, quantity, result) in results {
            match result {
                Ok(product) => {
                    let line_total = product.price.times(quantity);
                    lines.push(PricedCartLine {
                        code: code.clone(),
                        name: product.name,
                        quantity,
                        formatted_line_total: line_total.display(),
                        unit_price: product.price,
                        formatted_price: product.formatted_price,
                        image_url: product.image_url,
                        line_total,
                    });
                }
                Err(CatalogError::NotFound(_)) => {
                    debug!(code = %code, "Cart product no longer in catalog");
                    unpriced.push(code.clone());
                }
                Err(e) => {
                    warn!(code = %code, error = %e, "Could not price cart line");
                    unpriced.push(code.clone());
                }
            }
        }

        let currency = lines
            .first()
            .map_or(DEFAULT_CURRENCY_ISO, |line| line.unit_price.currency_iso.as_str())
            .to_string();
        let total = lines
            .iter()
            .fold(Money::zero(currency), |acc, line| acc.plus(&line.line_total));

        if !unpriced.is_empty() {
            warn!(
                skipped = unpriced.len(),
                priced = lines.len(),
                "Showing partially priced cart"
            );
        }

        PricedCart {
            item_count: lines.iter().map(|l| l.quantity).sum(),
            formatted_total: total.display(),
            total,
            lines,
            unpriced,
        }
    }
}
