//! Identifier types for markets and model time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based model period index.
pub type Period = usize;

/// Calendar year.
pub type Year = i32;

/// Identifies a market by the good it clears and the region it clears in.
///
/// The period dimension is held by the marketplace, so one key names the
/// same market across every period of the run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketKey {
    /// Good (commodity) name, e.g. `"Forest"` or `"FutureForest"`.
    pub good: String,
    /// Region name.
    pub region: String,
}

impl MarketKey {
    /// Create a key for a good in a region.
    pub fn new(good: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            good: good.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.good)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_key_display() {
        let key = MarketKey::new("Forest", "USA");
        assert_eq!(key.to_string(), "USA:Forest");
    }

    #[test]
    fn test_market_key_from_owned_and_borrowed() {
        let a = MarketKey::new("Coal", "USA");
        let b = MarketKey::new("Coal".to_string(), "USA".to_string());
        assert_eq!(a, b);
    }
}
