//! Business logic services for storefront.
//!
//! # Services
//!
//! - `categories` - Category list and per-category product counts
//! - `cart` - Per-session quantity maps
//! - `pricing` - Re-prices carts against the live catalog on every read

pub mod cart;
pub mod categories;
pub mod pricing;

pub use cart::CartStore;
pub use categories::{AggregatorSettings, CategoryAggregator, CategoryCount, CategoryOverview};
pub use pricing::{CartPricer, PricedCart, PricedCartLine};
