//! Key-value attachment for a market cell.

use std::collections::BTreeMap;

/// Named numeric values attached to one market in one period.
///
/// Technologies use these to hand calibration results to the next period,
/// e.g. `calPrice` (read-in calibration price), `calVarCost` (derived
/// variable cost) and `calSupply` (calibrated future supply).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketInfo {
    values: BTreeMap<String, f64>,
}

impl MarketInfo {
    /// Create an empty attachment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value.
    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Set a value, replacing any previous one.
    pub fn set_double(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Check whether a value is present.
    pub fn has_value(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Check if no values are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut info = MarketInfo::new();
        assert_eq!(info.get_double("calPrice"), None);
        info.set_double("calPrice", 4.2);
        assert_eq!(info.get_double("calPrice"), Some(4.2));
        info.set_double("calPrice", 5.0);
        assert_eq!(info.get_double("calPrice"), Some(5.0));
        assert!(info.has_value("calPrice"));
        assert_eq!(info.iter().count(), 1);
    }
}
