//! # On-chain Amounts
//!
//! [`Quantity`] is the single representation of a balance amount across the workspace.
//! It counts the chain's smallest indivisible unit (planck) as an exact `u128`.
//!
//! ## Arithmetic
//!
//! All arithmetic is checked. Callers get `None` on overflow/underflow and decide how to
//! report it; nothing wraps. `saturating_sub` exists for the few places where a clamp at
//! zero is the intended meaning (e.g. "at most this much can still be bonded").
//!
//! ## Display
//!
//! Rounding only ever happens in [`Quantity::format_units`], which truncates towards zero.
//!
//! ```rust
//! use shared::Quantity;
//!
//! let amount = Quantity::new(12_345_678_900_000); // 1234.56789 DOT at 10 decimals
//! assert_eq!(amount.format_units(10, 2), "1234.56");
//! ```
//!
//! ## Wire Format
//!
//! Serialized as a decimal string. JavaScript numbers cannot hold `u128` values without
//! precision loss, so the string form is the only lossless JSON encoding.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Exact amount in planck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(u128);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub const fn new(planck: u128) -> Self {
        Self(planck)
    }

    /// Raw planck value.
    pub const fn planck(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_sub(rhs.0))
    }

    /// Sum an iterator of amounts, returning `None` on overflow.
    pub fn checked_sum<I>(iter: I) -> Option<Quantity>
    where
        I: IntoIterator<Item = Quantity>,
    {
        iter.into_iter()
            .try_fold(Quantity::ZERO, |acc, q| acc.checked_add(q))
    }

    /// Render the amount in whole units with `decimals` chain decimals, keeping at most
    /// `precision` fractional digits. Extra digits are truncated, trailing zeros trimmed.
    pub fn format_units(self, decimals: u32, precision: u32) -> String {
        let digits = self.0.to_string();
        let decimals = decimals as usize;

        let (whole, fraction) = if digits.len() > decimals {
            let split = digits.len() - decimals;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
        };

        let keep = fraction.len().min(precision as usize);
        let fraction = fraction[..keep].trim_end_matches('0');

        if fraction.is_empty() {
            whole
        } else {
            format!("{}.{}", whole, fraction)
        }
    }
}

impl From<u128> for Quantity {
    fn from(planck: u128) -> Self {
        Quantity(planck)
    }
}

impl From<u64> for Quantity {
    fn from(planck: u64) -> Self {
        Quantity(planck as u128)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseQuantityError(s.to_string()));
        }
        trimmed
            .parse::<u128>()
            .map(Quantity)
            .map_err(|_| ParseQuantityError(s.to_string()))
    }
}

/// Error returned when a string is not a non-negative integer amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQuantityError(pub String);

impl fmt::Display for ParseQuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid quantity: {:?}", self.0)
    }
}

impl std::error::Error for ParseQuantityError {}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
                Ok(Quantity::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
                u64::try_from(v)
                    .map(Quantity::from)
                    .map_err(|_| E::custom("quantity cannot be negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}
