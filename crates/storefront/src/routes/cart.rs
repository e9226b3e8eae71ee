//! Cart route handlers.
//!
//! The cart lives in the server-side store keyed by the shopper's session.
//! Mutations answer with the bare quantity map; `GET /api/cart` prices every
//! line against the catalog on each read.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use itu_shop_core::{CartLines, Money, ProductCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{CsrfProtected, ShopperSession};
use crate::services::{PricedCart, PricedCartLine};
use crate::state::AppState;

/// Shown when the cart has no lines.
const EMPTY_CART_NOTICE: &str = "Your cart is empty.";

/// Shown when some lines could not be priced on this read.
const PARTIAL_CART_NOTICE: &str =
    "Some items in your cart could not be loaded right now and are not shown.";

/// Quantity used when an add request omits one.
const DEFAULT_ADD_QUANTITY: i64 = 1;

/// Body of add and update requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    #[serde(alias = "product_code")]
    pub product_code: String,
    pub quantity: Option<i64>,
}

/// Body of remove requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLineRequest {
    #[serde(alias = "product_code")]
    pub product_code: String,
}

/// Quantity map returned by every mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemsResponse {
    pub items: CartLines,
    pub item_count: u32,
}

impl From<CartLines> for CartItemsResponse {
    fn from(items: CartLines) -> Self {
        Self {
            item_count: items.item_count(),
            items,
        }
    }
}

/// Priced cart as returned by `GET /api/cart`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<PricedCartLine>,
    pub total: Money,
    pub formatted_total: String,
    pub item_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unpriced: Vec<ProductCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

impl CartView {
    fn new(cart: &CartLines, priced: PricedCart) -> Self {
        let notice = if cart.is_empty() {
            Some(EMPTY_CART_NOTICE)
        } else if priced.is_partial() {
            Some(PARTIAL_CART_NOTICE)
        } else {
            None
        };

        Self {
            lines: priced.lines,
            total: priced.total,
            formatted_total: priced.formatted_total,
            item_count: priced.item_count,
            unpriced: priced.unpriced,
            notice,
        }
    }
}

/// Display the caller's cart, priced against the catalog.
#[instrument(skip(state, shopper), fields(session = %shopper.id()))]
pub async fn show(State(state): State<AppState>, shopper: ShopperSession) -> Result<Json<CartView>> {
    let cart = state.carts().get(shopper.id()).await;
    let priced = state.pricer().price_cart(&cart).await;

    if priced.is_partial() {
        tracing::warn!(
            unpriced = priced.unpriced.len(),
            "Serving partial cart view"
        );
    }

    Ok(Json(CartView::new(&cart, priced)))
}

/// Add a product to the cart.
#[instrument(skip_all, fields(session = %shopper.id()))]
pub async fn add(
    _csrf: CsrfProtected,
    State(state): State<AppState>,
    shopper: ShopperSession,
    body: std::result::Result<Json<CartLineRequest>, JsonRejection>,
) -> Result<Json<CartItemsResponse>> {
    let Json(request) = body?;
    let code = ProductCode::parse(&request.product_code)?;
    let quantity = request.quantity.unwrap_or(DEFAULT_ADD_QUANTITY);

    let items = state.carts().add(shopper.id(), code.clone(), quantity).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("code", code.as_str()), ("quantity", &quantity.to_string())]),
    );

    Ok(Json(items.into()))
}

/// Set the quantity of a line already in the cart.
///
/// A quantity of zero or less removes the line.
#[instrument(skip_all, fields(session = %shopper.id()))]
pub async fn update(
    _csrf: CsrfProtected,
    State(state): State<AppState>,
    shopper: ShopperSession,
    body: std::result::Result<Json<CartLineRequest>, JsonRejection>,
) -> Result<Json<CartItemsResponse>> {
    let Json(request) = body?;
    let code = ProductCode::parse(&request.product_code)?;
    let quantity = request
        .quantity
        .ok_or_else(|| AppError::InvalidArgument("quantity is required".to_string()))?;

    let items = state.carts().update(shopper.id(), &code, quantity).await?;

    add_breadcrumb(
        "cart",
        "Updated cart line",
        Some(&[("code", code.as_str()), ("quantity", &quantity.to_string())]),
    );

    Ok(Json(items.into()))
}

/// Remove a line from the cart.
#[instrument(skip_all, fields(session = %shopper.id()))]
pub async fn remove(
    _csrf: CsrfProtected,
    State(state): State<AppState>,
    shopper: ShopperSession,
    body: std::result::Result<Json<RemoveLineRequest>, JsonRejection>,
) -> Result<Json<CartItemsResponse>> {
    let Json(request) = body?;
    let code = ProductCode::parse(&request.product_code)?;

    let items = state.carts().remove(shopper.id(), &code).await?;

    add_breadcrumb("cart", "Removed from cart", Some(&[("code", code.as_str())]));

    Ok(Json(items.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn code(s: &str) -> ProductCode {
        ProductCode::parse(s).unwrap()
    }

    fn priced(unpriced: Vec<ProductCode>) -> PricedCart {
        PricedCart {
            lines: Vec::new(),
            total: Money::zero("CHF"),
            formatted_total: "CHF 0.00".to_string(),
            item_count: 0,
            unpriced,
        }
    }

    #[test]
    fn test_request_accepts_both_field_spellings() {
        let camel: CartLineRequest =
            serde_json::from_str(r#"{"productCode":"P1","quantity":2}"#).unwrap();
        let snake: CartLineRequest =
            serde_json::from_str(r#"{"product_code":"P1","quantity":2}"#).unwrap();

        assert_eq!(camel.product_code, "P1");
        assert_eq!(snake.product_code, "P1");
        assert_eq!(snake.quantity, Some(2));
    }

    #[test]
    fn test_empty_cart_notice() {
        let view = CartView::new(&CartLines::new(), priced(Vec::new()));
        assert_eq!(view.notice, Some(EMPTY_CART_NOTICE));
    }

    #[test]
    fn test_partial_cart_notice() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 1).unwrap();

        let view = CartView::new(&cart, priced(vec![code("P1")]));
        assert_eq!(view.notice, Some(PARTIAL_CART_NOTICE));
    }

    #[test]
    fn test_complete_cart_has_no_notice() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 2).unwrap();

        let mut full = priced(Vec::new());
        full.total = Money::new(Decimal::new(2000, 2), "CHF");
        full.item_count = 2;

        let view = CartView::new(&cart, full);
        assert_eq!(view.notice, None);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("notice").is_none());
        assert!(json.get("unpriced").is_none());
        assert_eq!(json["itemCount"], 2);
    }

    #[test]
    fn test_items_response_sorted_by_code() {
        let mut cart = CartLines::new();
        cart.add(code("P2"), 1).unwrap();
        cart.add(code("P1"), 3).unwrap();

        let json = serde_json::to_string(&CartItemsResponse::from(cart)).unwrap();
        assert_eq!(json, r#"{"items":{"P1":3,"P2":1},"itemCount":4}"#);
    }
}
