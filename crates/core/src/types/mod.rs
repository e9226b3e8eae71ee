//! Core types for the ITU Shop storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod category;
pub mod credential;
pub mod id;
pub mod price;
pub mod slug;

pub use cart::{CartError, CartLines, validate_quantity, MAX_LINE_QUANTITY, MIN_LINE_QUANTITY};
pub use category::{Category, CategoryCounts, CountKey};
pub use credential::{CredentialToken, TOKEN_EXPIRY_MARGIN_SECS};
pub use id::{ProductCode, ProductCodeError, SessionId};
pub use price::{DEFAULT_CURRENCY_ISO, Money};
pub use slug::NormalizedSlug;
