//! Type-safe price representation using decimal arithmetic.
//!
//! The backend sends prices as plain JSON numbers in rupees. They are held as
//! [`Decimal`] so cart and order totals never accumulate float error, and
//! converted to minor units (paise) only when handed to the payment gateway.

use core::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in Indian rupees.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// A zero amount in the default currency.
    #[must_use]
    pub const fn zero() -> Self {
        Self::inr(Decimal::ZERO)
    }

    /// Amount in the smallest currency unit, rounded half away from zero.
    ///
    /// Payment gateways take integer minor units (`₹499.99` → `49999`).
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).round().to_i64()
    }

    /// Format for display, e.g. `₹1299.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount.round_dp(2))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Currency symbol used in the storefront.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// ISO code as sent to the payment gateway.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::INR),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn inr(s: &str) -> Price {
        Price::inr(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(inr("499.99").to_minor_units(), Some(49_999));
        assert_eq!(inr("12000").to_minor_units(), Some(1_200_000));
        assert_eq!(inr("0.005").to_minor_units(), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(inr("1299").display(), "₹1299.00");
        assert_eq!(inr("15.5").to_string(), "₹15.50");
    }

    #[test]
    fn test_line_total_and_sum() {
        let lines = [inr("250.50") * 2, inr("99") * 3];
        let total: Price = lines.into_iter().sum();
        assert_eq!(total, inr("798.00"));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(CurrencyCode::from_str("inr").unwrap(), CurrencyCode::INR);
        assert!(CurrencyCode::from_str("EUR").is_err());
    }
}
