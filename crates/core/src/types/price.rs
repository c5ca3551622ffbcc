//! Non-negative product price using decimal arithmetic.
//!
//! Prices arrive as form text (`"399"`, `"12.50"`) or JSON numbers and are
//! kept as [`Decimal`] so they never pick up binary floating point error.
//! On the wire a price is a JSON number, which is what storefront clients
//! expect.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// No price was supplied.
    #[error("Price is required")]
    Missing,
    /// The value is not a decimal number.
    #[error("Invalid price format")]
    InvalidFormat,
    /// The value is below zero.
    #[error("Price cannot be negative")]
    Negative,
    /// The value has more precision than a stored price keeps.
    #[error("Price has too many significant digits")]
    TooPrecise,
}

/// A validated, non-negative product price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero, or
    /// `PriceError::TooPrecise` if it would not read back unchanged from a
    /// JSON number.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if !survives_json_number(amount) {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount.normalize()))
    }

    /// Parse a price from user-supplied text.
    ///
    /// Surrounding whitespace is ignored. An empty string is reported as
    /// missing rather than malformed.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Missing`, `PriceError::InvalidFormat` or
    /// `PriceError::Negative` or `PriceError::TooPrecise`.
    pub fn parse(input: &str) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Missing);
        }

        let amount = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| PriceError::InvalidFormat)?;

        Self::new(amount)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

/// Whether `amount` written the way [`Price`] serializes it parses back to
/// the same value.
fn survives_json_number(amount: Decimal) -> bool {
    if amount.fract().is_zero() && amount.to_u64().is_some() {
        return true;
    }
    amount
        .to_f64()
        .and_then(|value| Decimal::from_str(&value.to_string()).ok())
        .is_some_and(|back| back == amount)
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(whole) = self.0.to_u64().filter(|_| self.0.fract().is_zero()) {
            return serializer.serialize_u64(whole);
        }
        // Construction guarantees this conversion is exact.
        match self.0.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.collect_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceVisitor;

        impl de::Visitor<'_> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative number or numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
                Price::new(Decimal::from(v)).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
                Price::new(Decimal::from(v)).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
                // Display for f64 is the shortest string that round-trips,
                // so 12.99 parses back as exactly 12.99.
                Price::parse(&v.to_string()).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
                Price::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}
