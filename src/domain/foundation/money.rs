//! Money value object for EUR amounts.
//!
//! Amounts are stored as integer cents. The public API accepts decimal euro
//! values and converts them at cent precision, matching what the payment
//! processor expects in its `unit_amount` fields.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// Non-negative EUR amount in integer cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates an amount from integer cents. Negative amounts are rejected.
    pub fn from_cents(cents: i64) -> Result<Self, ValidationError> {
        if cents < 0 {
            return Err(ValidationError::out_of_range("amount", 0, i64::MAX, cents));
        }
        Ok(Self(cents))
    }

    /// Creates an amount from a decimal euro value, rounding half away from
    /// zero at cent precision.
    pub fn from_eur(eur: f64) -> Result<Self, ValidationError> {
        if !eur.is_finite() {
            return Err(ValidationError::invalid_format(
                "amount",
                "must be a finite number",
            ));
        }
        if eur < 0.0 {
            return Err(ValidationError::invalid_format(
                "amount",
                "must not be negative",
            ));
        }
        Ok(Self((eur * 100.0).round() as i64))
    }

    /// Returns the amount in integer cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the amount as a decimal euro value.
    pub fn as_eur(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts `other`, failing if the result would be negative.
    pub fn subtract(&self, other: Money) -> Result<Money, ValidationError> {
        if other.0 > self.0 {
            return Err(ValidationError::invalid_format(
                "discount",
                "cannot exceed the amount",
            ));
        }
        Ok(Money(self.0 - other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} EUR", self.0 / 100, self.0 % 100)
    }
}
