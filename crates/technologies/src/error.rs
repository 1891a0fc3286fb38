//! Error types for technology setup.

use marketplace::MarketplaceError;
use thiserror::Error;

/// Errors raised while building or initializing a technology.
///
/// Per-trial calculation never fails: a missing market during a solve is
/// logged and the contribution dropped, so only setup paths return these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TechnologyError {
    #[error("unknown technology type '{0}'")]
    UnknownType(String),

    #[error("technology entry is missing '{0}'")]
    MissingField(&'static str),

    #[error("invalid value for '{field}' in {technology}: {reason}")]
    InvalidField {
        technology: String,
        field: String,
        reason: String,
    },

    #[error("land type '{0}' is not known to the land allocator")]
    UnknownLandType(String),

    #[error("year {year} of {technology} is outside the model horizon")]
    YearOutsideHorizon { technology: String, year: i32 },

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),
}

/// Result type for technology operations.
pub type Result<T> = std::result::Result<T, TechnologyError>;
