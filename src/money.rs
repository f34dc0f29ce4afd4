//! Defines the `Money` type, an exact decimal amount used for all monetary
//! values in the application.
//!
//! Amounts are stored, added and compared as exact decimals. Conversion to a
//! float only happens as the final step when computing display percentages,
//! see [crate::analysis].

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
    str::FromStr,
};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An exact decimal amount of money.
///
/// Wraps [rust_decimal::Decimal] so that monetary values are never stored or
/// summed as binary floating point. Amounts round half away from zero, e.g.
/// `0.005` rounds to `0.01`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars and zero cents.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Create an amount from an exact decimal.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse an amount from its decimal string form, e.g. `"123.45"`.
    ///
    /// A string that does not parse as a decimal is treated as zero.
    pub fn parse(text: &str) -> Self {
        Decimal::from_str(text.trim()).map(Self).unwrap_or_default()
    }

    /// The underlying exact decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// The amount rounded to two decimal places, half away from zero.
    pub fn round2(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// The number of digits in the fractional part of the canonical decimal
    /// form, e.g. `123.450` has two fractional digits.
    pub fn fractional_digits(&self) -> u32 {
        self.0.normalize().scale()
    }

    /// Whether the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|amount| amount.0).sum())
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(Money::parse)
    }
}

#[cfg(test)]
mod money_tests {
    use rust_decimal_macros::dec;

    use super::Money;

    #[test]
    fn parse_reads_decimal_strings() {
        assert_eq!(Money::parse("123.45"), Money::new(dec!(123.45)));
        assert_eq!(Money::parse(" 0.01 "), Money::new(dec!(0.01)));
    }

    #[test]
    fn parse_treats_garbage_as_zero() {
        assert_eq!(Money::parse("not a number"), Money::ZERO);
        assert_eq!(Money::parse(""), Money::ZERO);
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(0.005)).round2(), Money::new(dec!(0.01)));
        assert_eq!(Money::new(dec!(1.994)).round2(), Money::new(dec!(1.99)));
        assert_eq!(Money::new(dec!(1.995)).round2(), Money::new(dec!(2.00)));
    }

    #[test]
    fn fractional_digits_ignores_trailing_zeroes() {
        assert_eq!(Money::parse("123.450").fractional_digits(), 2);
        assert_eq!(Money::parse("123.456").fractional_digits(), 3);
        assert_eq!(Money::parse("123").fractional_digits(), 0);
    }

    #[test]
    fn sum_is_exact() {
        let amounts = [Money::parse("0.10"), Money::parse("0.20")];

        let total: Money = amounts.into_iter().sum();

        assert_eq!(total, Money::parse("0.30"));
    }

    #[test]
    fn display_forces_two_decimal_places() {
        assert_eq!(Money::parse("5").to_string(), "5.00");
        assert_eq!(Money::parse("5.5").to_string(), "5.50");
    }
}
