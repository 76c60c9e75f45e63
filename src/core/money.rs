//! Fixed-point money.
//!
//! `Money` is a signed count of cents. Balances accumulate over an unbounded number of
//! transactions, so amounts never pass through binary floating point: input arrives as a
//! decimal string, is checked to fit in two fractional digits, and leaves as an exact
//! `Decimal`.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Number of fractional digits kept for every amount.
pub const SCALE: u32 = 2;

/// Largest accepted magnitude of a single amount, in cents (ten trillion units).
///
/// Keeps every delta and per-account sum the ledger computes well inside `i64`.
pub const MAX_CENTS: i64 = 1_000_000_000_000_000;

/// Signed amount of money in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw cent count.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Raw cent count as stored in the database.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// True for exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Converts a decimal with at most two fractional digits.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value.normalize().scale() > SCALE {
            return Err(Error::validation(format!(
                "Amount '{value}' has more than {SCALE} decimal places"
            )));
        }
        value
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .filter(|cents| cents.abs() <= MAX_CENTS)
            .map(Self)
            .ok_or_else(|| Error::validation(format!("Amount '{value}' is out of range")))
    }

    /// Parses a signed decimal string such as `"-12.50"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("Amount is required"));
        }
        let value = trimmed
            .parse::<Decimal>()
            .map_err(|_| Error::validation(format!("Invalid amount '{trimmed}'")))?;
        Self::from_decimal(value)
    }

    /// Parses a transaction magnitude: like [`Money::parse`] but rejects negatives.
    pub fn parse_magnitude(raw: &str) -> Result<Self> {
        let amount = Self::parse(raw)?;
        if amount.is_negative() {
            return Err(Error::validation(format!(
                "Amount must not be negative, got '{}'",
                raw.trim()
            )));
        }
        Ok(amount)
    }

    /// Exact decimal value with two fractional digits.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, SCALE)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_exact_cents() {
        assert_eq!(Money::parse("30.00").unwrap(), Money::from_cents(3000));
        assert_eq!(Money::parse("0.1").unwrap(), Money::from_cents(10));
        assert_eq!(Money::parse(" 12 ").unwrap(), Money::from_cents(1200));
        assert_eq!(Money::parse("-4.05").unwrap(), Money::from_cents(-405));
    }

    #[test]
    fn test_trailing_zeros_beyond_scale_are_accepted() {
        assert_eq!(Money::parse("1.2500").unwrap(), Money::from_cents(125));
    }

    #[test]
    fn test_rejects_non_numeric_and_excess_precision() {
        assert!(matches!(Money::parse("abc"), Err(Error::Validation { .. })));
        assert!(matches!(Money::parse(""), Err(Error::Validation { .. })));
        assert!(matches!(Money::parse("1.005"), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_rejects_amounts_beyond_the_cap() {
        assert_eq!(
            Money::parse("10000000000000.00").unwrap(),
            Money::from_cents(MAX_CENTS)
        );
        assert_eq!(
            Money::parse("-10000000000000").unwrap(),
            Money::from_cents(-MAX_CENTS)
        );
        assert!(matches!(
            Money::parse("10000000000000.01"),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            Money::parse("92233720368547758.07"),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_magnitude_rejects_negative() {
        assert!(matches!(
            Money::parse_magnitude("-1"),
            Err(Error::Validation { .. })
        ));
        assert_eq!(Money::parse_magnitude("0").unwrap(), Money::ZERO);
    }

    #[test]
    fn test_no_drift_over_many_additions() {
        let dime = Money::parse("0.10").unwrap();
        let total: Money = std::iter::repeat_n(dime, 1000).sum();
        assert_eq!(total.to_decimal(), Decimal::from_str("100.00").unwrap());
    }

    #[test]
    fn test_serializes_as_exact_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(7000)).unwrap();
        assert_eq!(json, "\"70.00\"");
    }
}
