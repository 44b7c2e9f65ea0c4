//! Fixed-point currency with two decimal places.
//!
//! Balances and payouts are kept as whole cents so that settling a wager is
//! exact integer arithmetic. Floating point only appears at the edges: the
//! wire format (plain JSON numbers) and the bet / multiplier products, which
//! are rounded half away from zero to the nearest cent.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Largest magnitude accepted when converting from `f64`. Keeps the cent
/// value exactly representable in both `f64` and `i64`.
const MAX_CENTS: f64 = 9_007_199_254_740_991.0;

/// Amount of currency in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Round `value` to two decimals, half away from zero.
    ///
    /// Returns `None` for NaN, infinities and values too large to hold.
    pub fn round_from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if !cents.is_finite() || cents.abs() > MAX_CENTS {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// `self * factor`, rounded half away from zero to the cent.
    ///
    /// Works on the cent value so that exact halves such as `0.15 * 0.5`
    /// are not lost to binary representation of the decimal amount.
    pub fn scale(self, factor: f64) -> Option<Self> {
        if !factor.is_finite() {
            return None;
        }
        let cents = (self.0 as f64 * factor).round();
        if !cents.is_finite() || cents.abs() > MAX_CENTS {
            return None;
        }
        Some(Money(cents as i64))
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.map(|m| m.0).sum())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::round_from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("amount out of range: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(Money::round_from_f64(0.125), Some(Money::from_cents(13)));
        assert_eq!(Money::round_from_f64(-0.125), Some(Money::from_cents(-13)));
        assert_eq!(Money::round_from_f64(0.124), Some(Money::from_cents(12)));
    }

    #[test]
    fn test_bet_amount_example() {
        // 1 * 10 * 0.01 carries float noise; rounding must absorb it
        assert_eq!(Money::round_from_f64(1.0 * 10.0 * 0.01), Some(Money::from_cents(10)));
        assert_eq!(Money::round_from_f64(0.1 * 5.0), Some(Money::from_cents(50)));
    }

    #[test]
    fn test_scale_keeps_exact_halves() {
        assert_eq!(Money::from_cents(15).scale(0.5), Some(Money::from_cents(8)));
        assert_eq!(Money::from_cents(10).scale(5.0), Some(Money::from_cents(50)));
        assert_eq!(Money::from_cents(10).scale(f64::NAN), None);
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(Money::round_from_f64(f64::NAN), None);
        assert_eq!(Money::round_from_f64(f64::INFINITY), None);
        assert_eq!(Money::round_from_f64(1e300), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1_000_000).to_string(), "10000.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_json_is_plain_number() {
        let json = serde_json::to_string(&Money::from_cents(1234)).unwrap();
        assert_eq!(json, "12.34");

        let back: Money = serde_json::from_str("12.34").unwrap();
        assert_eq!(back, Money::from_cents(1234));
    }
}
