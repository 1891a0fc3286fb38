//! Solver configuration options.

use serde::{Deserialize, Serialize};
use types::Configuration;

/// Configuration for the bisection + Newton-Raphson solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    /// A market is solved when |ED| is within this fraction of
    /// max(supply, demand).
    pub relative_tolerance: f64,

    /// A market is also solved when |ED| is below this absolute amount.
    pub absolute_tolerance: f64,

    /// Hard cap on calculation passes per period, including the final
    /// re-evaluation at the best trial.
    pub max_evaluations: usize,

    /// Iterations allowed for the bracketing phase.
    pub max_bracket_iterations: usize,

    /// Factor applied to a price while searching for a bracket.
    pub bracket_expansion: f64,

    /// Finite-difference step as a fraction of the price.
    pub derivative_step: f64,

    /// Derivatives smaller than this in magnitude fall back to bisection.
    pub derivative_floor: f64,

    /// Lowest trial price.
    pub min_price: f64,

    /// Highest trial price.
    pub max_price: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-3,
            absolute_tolerance: 1e-6,
            max_evaluations: 1000,
            max_bracket_iterations: 60,
            bracket_expansion: 2.0,
            derivative_step: 1e-4,
            derivative_floor: 1e-12,
            min_price: 1e-8,
            max_price: 1e12,
        }
    }
}

impl SolverConfig {
    /// Read overrides from the run configuration.
    ///
    /// Keys: `solverRelativeTolerance`, `solverAbsoluteTolerance`,
    /// `solverMaxEvaluations`, `solverMaxBracketIterations`.
    pub fn from_configuration(conf: &Configuration) -> Self {
        let defaults = Self::default();
        Self {
            relative_tolerance: conf
                .get_double("solverRelativeTolerance", defaults.relative_tolerance),
            absolute_tolerance: conf
                .get_double("solverAbsoluteTolerance", defaults.absolute_tolerance),
            max_evaluations: conf
                .get_int("solverMaxEvaluations", defaults.max_evaluations as i64)
                .max(1) as usize,
            max_bracket_iterations: conf
                .get_int(
                    "solverMaxBracketIterations",
                    defaults.max_bracket_iterations as i64,
                )
                .max(0) as usize,
            ..defaults
        }
    }

    /// Set the relative tolerance.
    pub fn with_relative_tolerance(mut self, tolerance: f64) -> Self {
        self.relative_tolerance = tolerance;
        self
    }

    /// Set the absolute tolerance.
    pub fn with_absolute_tolerance(mut self, tolerance: f64) -> Self {
        self.absolute_tolerance = tolerance;
        self
    }

    /// Set the evaluation budget.
    pub fn with_max_evaluations(mut self, max: usize) -> Self {
        self.max_evaluations = max.max(1);
        self
    }

    /// Set the bracketing iteration budget.
    pub fn with_max_bracket_iterations(mut self, max: usize) -> Self {
        self.max_bracket_iterations = max;
        self
    }

    /// Whether an excess demand is within tolerance.
    pub fn within_tolerance(&self, excess_demand: f64, supply: f64, demand: f64) -> bool {
        let ed = excess_demand.abs();
        ed <= self.absolute_tolerance || ed <= self.relative_tolerance * supply.max(demand)
    }

    /// Keep a trial price inside the allowed range.
    pub fn clamp_price(&self, price: f64) -> f64 {
        if price.is_nan() {
            return self.min_price;
        }
        price.clamp(self.min_price, self.max_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance() {
        let config = SolverConfig::default();
        assert!(config.within_tolerance(0.0, 0.0, 0.0));
        assert!(config.within_tolerance(1e-7, 0.0, 1e-7));
        assert!(config.within_tolerance(0.05, 100.0, 100.05));
        assert!(!config.within_tolerance(0.5, 100.0, 100.5));
    }

    #[test]
    fn test_clamp_price() {
        let config = SolverConfig::default();
        assert_eq!(config.clamp_price(-1.0), config.min_price);
        assert_eq!(config.clamp_price(f64::INFINITY), config.max_price);
        assert_eq!(config.clamp_price(f64::NAN), config.min_price);
        assert_eq!(config.clamp_price(3.0), 3.0);
    }

    #[test]
    fn test_from_configuration() {
        let mut conf = Configuration::new();
        conf.set("solverRelativeTolerance", 0.01);
        conf.set("solverMaxEvaluations", 50.0);
        let config = SolverConfig::from_configuration(&conf);
        assert_eq!(config.relative_tolerance, 0.01);
        assert_eq!(config.max_evaluations, 50);
        assert_eq!(config.max_bracket_iterations, 60);
    }
}
