//! Fixed-point scalar used for every price and amount in the engine.
//!
//! Backed by `rust_decimal` and normalized to eight fractional digits on
//! construction, so two values compare equal exactly when their 8-digit
//! representations are identical. Serialized as a string to prevent JSON
//! number precision loss. No binary floating point anywhere on the match
//! path.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by every [`Fixed`] value.
pub const SCALE: u32 = 8;

/// Error produced when a decimal string cannot be converted to a [`Fixed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid decimal string: {0}")]
pub struct ParseFixedError(String);

/// A signed fixed-point number with exactly eight fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed(Decimal);

impl Fixed {
    pub const ZERO: Fixed = Fixed(Decimal::ZERO);

    /// Rounds an arbitrary decimal to the 8-digit representation.
    ///
    /// Midpoints round away from zero, matching the venue's tick rounding.
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn from_integer(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parses a decimal string, rounding to eight fractional digits.
    pub fn from_decimal_str(s: &str) -> Result<Self, ParseFixedError> {
        let decimal = Decimal::from_str(s).map_err(|_| ParseFixedError(s.to_string()))?;
        Ok(Self::new(decimal))
    }

    pub fn mul_int(self, n: i64) -> Self {
        Self::new(self.0 * Decimal::from(n))
    }

    /// Re-applies the 8-digit rounding. A no-op for values built through
    /// the constructors; kept for values assembled from raw decimals.
    pub fn round_to_8(self) -> Self {
        Self::new(self.0)
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// The backing decimal, for database binds.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl From<Decimal> for Fixed {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl FromStr for Fixed {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Trailing zeros are stripped so the string round-trips through
        // the JSON interface without carrying scale noise.
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Fixed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fixed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_decimal_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_construction_rounds_to_eight_digits() {
        let v = Fixed::new(dec!(0.123456789));
        assert_eq!(v.to_string(), "0.12345679");

        let half_up = Fixed::new(dec!(0.000000005));
        assert_eq!(half_up.to_string(), "0.00000001");
    }

    #[test]
    fn test_key_equality_is_eight_digit_equality() {
        let a = Fixed::from_decimal_str("40000.1").unwrap();
        let b = Fixed::from_decimal_str("40000.10000000").unwrap();
        assert_eq!(a, b);

        let c = Fixed::from_decimal_str("40000.100000004").unwrap();
        assert_eq!(a, c); // rounds down to the same representation

        let d = Fixed::from_decimal_str("40000.10000001").unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_arithmetic() {
        let a = Fixed::from_decimal_str("1.5").unwrap();
        let b = Fixed::from_decimal_str("0.4").unwrap();

        assert_eq!(a + b, Fixed::from_decimal_str("1.9").unwrap());
        assert_eq!(a - b, Fixed::from_decimal_str("1.1").unwrap());
        assert_eq!(a.mul_int(3), Fixed::from_decimal_str("4.5").unwrap());
        assert_eq!(a.min(b), b);
        assert_eq!(Fixed::from_integer(40000).to_string(), "40000");
    }

    #[test]
    fn test_ordering() {
        let lo = Fixed::from_decimal_str("39999.99999999").unwrap();
        let hi = Fixed::from_decimal_str("40000").unwrap();
        assert!(lo < hi);
        assert!(hi >= lo);
        assert!(Fixed::ZERO.is_zero());
        assert!(hi.is_positive());
    }

    #[test]
    fn test_serde_round_trip() {
        let v = Fixed::from_decimal_str("40000.00000001").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"40000.00000001\"");

        let back: Fixed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_invalid_string_rejected() {
        assert!(Fixed::from_decimal_str("not-a-number").is_err());
        assert!("1.2.3".parse::<Fixed>().is_err());
    }
}
