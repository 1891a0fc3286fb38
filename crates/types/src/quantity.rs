//! Fixed-point quantity accumulator.
//!
//! Supply and demand are summed from many technologies in an arbitrary order.
//! Floating-point addition is not associative, so the totals are kept in a
//! fixed-point integer: every contribution is rounded once on the way in and
//! the integer sum is independent of the order contributions arrive in.
//!
//! The resolution is [`QUANTITY_RESOLUTION`]; a contribution smaller than
//! half of it rounds to zero. Amounts whose raw value would not fit in an
//! `i128` are rejected rather than saturated, and sums are checked.

use derive_more::{Add, Sub, Sum};
use std::fmt;
use thiserror::Error;

/// Fixed-point scale: `1_000_000_000` raw units = 1.0.
pub const QUANTITY_SCALE: f64 = 1e9;

/// Smallest representable non-zero quantity.
pub const QUANTITY_RESOLUTION: f64 = 1.0 / QUANTITY_SCALE;

/// Largest magnitude [`Quantity::from_float`] accepts.
pub const QUANTITY_MAX: f64 = i128::MAX as f64 / QUANTITY_SCALE;

/// Why an amount could not become or join a [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("amount is NaN or infinite")]
    NonFinite,
    #[error("amount exceeds the fixed-point range")]
    OutOfRange,
}

/// Accumulated quantity with nine decimal places.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Add, Sub, Sum)]
pub struct Quantity(pub i128);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Convert a floating-point amount.
    ///
    /// `i128::MAX as f64` rounds up to 2^127, so the bound is exclusive.
    #[inline]
    pub fn from_float(v: f64) -> Result<Self, QuantityError> {
        if !v.is_finite() {
            return Err(QuantityError::NonFinite);
        }
        let raw = (v * QUANTITY_SCALE).round();
        if raw.abs() >= i128::MAX as f64 {
            return Err(QuantityError::OutOfRange);
        }
        Ok(Self(raw as i128))
    }

    /// Sum two quantities, failing instead of wrapping.
    #[inline]
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(QuantityError::OutOfRange)
    }

    /// Difference of two quantities, failing instead of wrapping.
    #[inline]
    pub fn checked_sub(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(QuantityError::OutOfRange)
    }

    /// Convert to floating-point for calculations.
    #[inline]
    pub fn to_float(self) -> f64 {
        self.0 as f64 / QUANTITY_SCALE
    }

    /// Check if zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qty({})", self.to_float())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_float())
    }
}
