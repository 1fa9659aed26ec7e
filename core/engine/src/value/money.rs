//! Currency-tagged fixed-point money values.

use crate::error::RuntimeError;
use std::{fmt, rc::Rc};

/// An ISO-4217-style currency code. Codes are compared case-sensitively;
/// hosts are expected to normalize to uppercase.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Currency(Rc<str>);

impl Currency {
    /// Creates a currency from its code.
    pub fn new(code: impl Into<Rc<str>>) -> Self {
        Self(code.into())
    }

    /// The currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of money in minor units (cents) of a single currency.
///
/// Arithmetic is currency-preserving: mixing currencies is an error, never
/// a conversion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a money value from minor units.
    #[must_use]
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.amount
    }

    /// The currency.
    #[must_use]
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    fn check_same_currency(&self, other: &Self, op: &str) -> Result<(), RuntimeError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(RuntimeError::runtime(format!(
                "cannot {op} money in {} and {}",
                self.currency, other.currency
            )))
        }
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: &Self) -> Result<Self, RuntimeError> {
        self.check_same_currency(other, "add")?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| RuntimeError::runtime("money amount overflow"))?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// Subtracts two amounts of the same currency.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, RuntimeError> {
        self.check_same_currency(other, "subtract")?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| RuntimeError::runtime("money amount overflow"))?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// Negates the amount.
    pub fn checked_neg(&self) -> Result<Self, RuntimeError> {
        let amount = self
            .amount
            .checked_neg()
            .ok_or_else(|| RuntimeError::runtime("money amount overflow"))?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// The absolute amount.
    pub fn checked_abs(&self) -> Result<Self, RuntimeError> {
        let amount = self
            .amount
            .checked_abs()
            .ok_or_else(|| RuntimeError::runtime("money amount overflow"))?;
        Ok(Self::new(amount, self.currency.clone()))
    }

    /// Orders two amounts of the same currency.
    pub fn compare(&self, other: &Self) -> Result<std::cmp::Ordering, RuntimeError> {
        self.check_same_currency(other, "compare")?;
        Ok(self.amount.cmp(&other.amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(f, "{sign}{}.{:02} {}", abs / 100, abs % 100, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(amount: i64) -> Money {
        Money::new(amount, Currency::new("USD"))
    }

    #[test]
    fn arithmetic_preserves_currency() {
        let sum = usd(150).checked_add(&usd(75)).expect("add failed");
        assert_eq!(sum.amount(), 225);
        assert_eq!(sum.currency().code(), "USD");
    }

    #[test]
    fn mixed_currencies_fail() {
        let eur = Money::new(100, Currency::new("EUR"));
        let err = usd(100).checked_add(&eur).unwrap_err();
        assert!(err.message().contains("USD"));
        assert!(err.message().contains("EUR"));
    }

    #[test]
    fn display_uses_minor_units() {
        assert_eq!(usd(1234).to_string(), "12.34 USD");
        assert_eq!(usd(-5).to_string(), "-0.05 USD");
    }
}
