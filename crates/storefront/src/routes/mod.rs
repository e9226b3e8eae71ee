//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness (catalog credentials can be issued)
//!
//! # Session
//! GET  /api/session            - Start or resume a session, returns {csrfToken}
//!
//! # Catalog
//! GET  /api/products           - Product search (?page&query&category)
//! GET  /api/products/{code}    - Product detail
//! GET  /api/categories         - Categories with product counts, returns
//!                                {categories: [{id, name, count}], totalProducts, degraded}
//!
//! # Cart (mutations need X-CSRF-Token, rate limited per client IP)
//! GET  /api/cart               - Priced cart view
//! POST /api/cart/add           - Add a line {productCode, quantity}
//! POST /api/cart/update        - Set a line's quantity {productCode, quantity}
//! POST /api/cart/remove        - Remove a line {productCode}
//! ```

pub mod cart;
pub mod categories;
pub mod health;
pub mod products;
pub mod session;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::cart_rate_limiter;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{code}", get(products::show))
}

/// Create the cart routes router.
///
/// Mutations sit behind the per-IP rate limiter; reading the cart does not.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove));

    let mutations = match cart_rate_limiter() {
        Some(limiter) => mutations.layer(limiter),
        None => {
            tracing::warn!("Cart rate limiter could not be configured; mutations are unthrottled");
            mutations
        }
    };

    Router::new().route("/", get(cart::show)).merge(mutations)
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::show))
        .route("/categories", get(categories::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api", api_routes())
}
