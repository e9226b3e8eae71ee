//! Session cart as a quantity map.
//!
//! The cart stores only product codes and quantities. Names and prices are
//! never stored here; they are resolved from the catalog each time the cart
//! is shown.

use std::collections::BTreeMap;

use serde::Serialize;

use super::id::ProductCode;

/// Smallest quantity a cart line may hold.
pub const MIN_LINE_QUANTITY: u32 = 1;

/// Largest quantity a cart line may hold; additive adds clamp to it.
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity outside the accepted range.
    #[error("quantity must be between {min} and {max} (got {got})")]
    InvalidQuantity {
        /// Smallest accepted quantity.
        min: u32,
        /// Largest accepted quantity.
        max: u32,
        /// Quantity the caller sent.
        got: i64,
    },
    /// No line for this product code.
    #[error("product {0} is not in the cart")]
    NotFound(ProductCode),
}

/// Product code to quantity mapping for one session.
///
/// Invariant: every stored quantity is within
/// `MIN_LINE_QUANTITY..=MAX_LINE_QUANTITY`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CartLines {
    lines: BTreeMap<ProductCode, u32>,
}

impl CartLines {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `code`, summing with any existing line and clamping
    /// at [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is outside
    /// `1..=10`; the cart is left untouched.
    pub fn add(&mut self, code: ProductCode, quantity: i64) -> Result<&Self, CartError> {
        let quantity = validate_quantity(quantity)?;
        let line = self.lines.entry(code).or_insert(0);
        *line = line.saturating_add(quantity).min(MAX_LINE_QUANTITY);
        Ok(&*self)
    }

    /// Set the quantity of an existing line. Zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a quantity above
    /// [`MAX_LINE_QUANTITY`] and [`CartError::NotFound`] if the line does not
    /// exist. The cart is unchanged on error.
    pub fn update(&mut self, code: &ProductCode, quantity: i64) -> Result<&Self, CartError> {
        if quantity <= 0 {
            return self.remove(code);
        }

        let quantity = validate_quantity(quantity)?;
        let line = self
            .lines
            .get_mut(code)
            .ok_or_else(|| CartError::NotFound(code.clone()))?;
        *line = quantity;
        Ok(&*self)
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the line does not exist.
    pub fn remove(&mut self, code: &ProductCode) -> Result<&Self, CartError> {
        self.lines
            .remove(code)
            .map(|_| &*self)
            .ok_or_else(|| CartError::NotFound(code.clone()))
    }

    /// Quantity for a product, if present.
    #[must_use]
    pub fn quantity(&self, code: &ProductCode) -> Option<u32> {
        self.lines.get(code).copied()
    }

    /// Iterate lines ordered by product code.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductCode, u32)> {
        self.lines.iter().map(|(code, qty)| (code, *qty))
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.values().sum()
    }
}

/// Check a requested quantity against `MIN_LINE_QUANTITY..=MAX_LINE_QUANTITY`.
///
/// # Errors
///
/// Returns [`CartError::InvalidQuantity`] when out of range.
pub fn validate_quantity(quantity: i64) -> Result<u32, CartError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (MIN_LINE_QUANTITY..=MAX_LINE_QUANTITY).contains(q))
        .ok_or(CartError::InvalidQuantity {
            min: MIN_LINE_QUANTITY,
            max: MAX_LINE_QUANTITY,
            got: quantity,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn code(s: &str) -> ProductCode {
        ProductCode::parse(s).unwrap()
    }

    #[test]
    fn test_add_creates_line() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 3).unwrap();
        assert_eq!(cart.quantity(&code("P1")), Some(3));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_add_clamps_at_max() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 3).unwrap();
        cart.add(code("P1"), 9).unwrap();
        assert_eq!(cart.quantity(&code("P1")), Some(10));
    }

    #[test]
    fn test_add_rejects_out_of_range() {
        let mut cart = CartLines::new();
        for bad in [0, -1, 11, i64::MAX] {
            assert!(matches!(
                cart.add(code("P1"), bad),
                Err(CartError::InvalidQuantity { .. })
            ));
        }
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_sets_directly() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 5).unwrap();
        cart.update(&code("P1"), 2).unwrap();
        assert_eq!(cart.quantity(&code("P1")), Some(2));
    }

    #[test]
    fn test_update_to_zero_is_remove() {
        let mut by_update = CartLines::new();
        by_update.add(code("P1"), 2).unwrap();
        by_update.add(code("P2"), 1).unwrap();
        let mut by_remove = by_update.clone();

        by_update.update(&code("P1"), 0).unwrap();
        by_remove.remove(&code("P1")).unwrap();

        assert_eq!(by_update, by_remove);
        assert_eq!(by_update.quantity(&code("P1")), None);
    }

    #[test]
    fn test_update_missing_is_not_found_and_unchanged() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 1).unwrap();
        let before = cart.clone();

        assert_eq!(
            cart.update(&code("P9"), 4),
            Err(CartError::NotFound(code("P9")))
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_above_max_rejected() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 1).unwrap();
        assert!(matches!(
            cart.update(&code("P1"), 11),
            Err(CartError::InvalidQuantity { got: 11, .. })
        ));
        assert_eq!(cart.quantity(&code("P1")), Some(1));
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let mut cart = CartLines::new();
        assert!(matches!(
            cart.remove(&code("P1")),
            Err(CartError::NotFound(_))
        ));
    }

    #[test]
    fn test_reapplying_update_is_idempotent() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 1).unwrap();
        cart.update(&code("P1"), 4).unwrap();
        let once = cart.clone();
        cart.update(&code("P1"), 4).unwrap();
        assert_eq!(cart, once);
    }

    #[test]
    fn test_item_count() {
        let mut cart = CartLines::new();
        cart.add(code("P1"), 2).unwrap();
        cart.add(code("P2"), 3).unwrap();
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_serializes_as_map() {
        let mut cart = CartLines::new();
        cart.add(code("P2"), 1).unwrap();
        cart.add(code("P1"), 2).unwrap();
        assert_eq!(
            serde_json::to_string(&cart).unwrap(),
            r#"{"P1":2,"P2":1}"#
        );
    }
}
