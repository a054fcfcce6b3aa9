//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount.
///
/// Backed by [`Decimal`] so that cart totals never accumulate binary
/// floating-point error. Serialized transparently as the decimal value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply this price by a quantity (e.g. a cart line subtotal).
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl core::str::FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_from_str() {
        assert_eq!("12.50".parse::<Price>().unwrap(), price("12.50"));
        assert!("not a price".parse::<Price>().is_err());
    }

    #[test]
    fn test_times() {
        assert_eq!(price("10").times(2), price("20"));
        assert_eq!(price("9.99").times(3), price("29.97"));
        assert_eq!(price("10").times(0), Price::ZERO);
    }

    #[test]
    fn test_add() {
        assert_eq!(price("1.50") + price("2.25"), price("3.75"));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(price("10").to_string(), "10.00");
        assert_eq!(price("2.5").to_string(), "2.50");
    }

    #[test]
    fn test_deserialize_from_number() {
        let p: Price = serde_json::from_str("10.5").unwrap();
        assert_eq!(p, price("10.5"));
    }
}
