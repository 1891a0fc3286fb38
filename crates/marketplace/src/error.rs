//! Error types for marketplace operations.

use thiserror::Error;
use types::{MarketKey, Period, QuantityError};

/// Result type for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketplaceError>;

/// Errors that can occur during marketplace operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketplaceError {
    /// No market is registered for the good and region.
    #[error("unknown market: {0}")]
    UnknownMarket(MarketKey),
    /// The period lies outside the model horizon.
    #[error("period {period} is outside the model horizon of {max_period} periods")]
    PeriodOutOfRange { period: Period, max_period: usize },
    /// No info attachment exists and creation was not requested.
    #[error("no market info for {key} in period {period}")]
    InfoNotFound { key: MarketKey, period: Period },
    /// A supply or demand contribution was NaN or infinite.
    #[error("non-finite quantity {value} added to {key} in period {period}")]
    NonFiniteQuantity {
        key: MarketKey,
        period: Period,
        value: f64,
    },
    /// A contribution, or the running total it would produce, does not fit
    /// the fixed-point accumulator.
    #[error("quantity {value} added to {key} in period {period} is out of range")]
    QuantityOutOfRange {
        key: MarketKey,
        period: Period,
        value: f64,
    },
    /// `init_prices` may only run once per marketplace.
    #[error("prices have already been initialized")]
    PricesAlreadyInitialized,
}

impl MarketplaceError {
    pub(crate) fn quantity(
        err: QuantityError,
        key: MarketKey,
        period: Period,
        value: f64,
    ) -> Self {
        match err {
            QuantityError::NonFinite => Self::NonFiniteQuantity { key, period, value },
            QuantityError::OutOfRange => Self::QuantityOutOfRange { key, period, value },
        }
    }
}
