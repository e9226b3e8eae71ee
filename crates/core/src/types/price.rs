//! Type-safe money representation using decimal arithmetic.
//!
//! Currency is passed through from the catalog as an ISO 4217 code; no
//! conversion between currencies is ever performed.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency used when the catalog omits one.
pub const DEFAULT_CURRENCY_ISO: &str = "CHF";

/// An amount of money in a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Amount in the currency's standard unit (e.g. francs, not rappen).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_iso: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency_iso: impl Into<String>) -> Self {
        Self {
            amount,
            currency_iso: currency_iso.into(),
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency_iso: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency_iso)
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_iso.clone())
    }

    /// Add another amount, keeping this amount's currency.
    #[must_use]
    pub fn plus(&self, other: &Self) -> Self {
        Self::new(self.amount + other.amount, self.currency_iso.clone())
    }

    /// Format for display with two decimals (e.g. `"CHF 20.00"`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {:.2}", self.currency_iso, self.amount.round_dp(2))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_two_decimals() {
        assert_eq!(Money::zero("CHF").display(), "CHF 0.00");
        assert_eq!(Money::new(Decimal::new(105, 1), "EUR").display(), "EUR 10.50");
    }

    #[test]
    fn test_display_rounds() {
        assert_eq!(Money::new(Decimal::new(19_999, 3), "CHF").display(), "CHF 20.00");
    }

    #[test]
    fn test_times_and_plus() {
        let unit = Money::new(Decimal::new(1000, 2), "CHF");
        let line = unit.times(2);
        assert_eq!(line.amount, Decimal::from(20));

        let total = Money::zero("CHF").plus(&line).plus(&unit);
        assert_eq!(total.amount, Decimal::from(30));
        assert_eq!(total.currency_iso, "CHF");
    }
}
