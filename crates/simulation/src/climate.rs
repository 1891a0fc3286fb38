//! Climate response to the run's emissions.
//!
//! The scenario writes the emissions artifact, flushes and closes it, then
//! calls [`ClimateModel::run`] exactly once.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;
use types::Year;

use crate::{ClimateError, EmissionsSeries};

/// A climate-response collaborator.
pub trait ClimateModel: Send {
    fn name(&self) -> &str;

    /// Compute the climate response from the run's emissions.
    fn run(&mut self, artifact: &Path, emissions: &EmissionsSeries) -> Result<(), ClimateError>;

    /// Global mean temperature change in a year, once run.
    fn temperature(&self, year: Year) -> Option<f64>;
}

/// Climate model that does nothing.
#[derive(Debug, Default)]
pub struct NoClimateModel;

impl ClimateModel for NoClimateModel {
    fn name(&self) -> &str {
        "none"
    }

    fn run(&mut self, _artifact: &Path, _emissions: &EmissionsSeries) -> Result<(), ClimateError> {
        Ok(())
    }

    fn temperature(&self, _year: Year) -> Option<f64> {
        None
    }
}

/// Temperature proportional to cumulative emissions of one gas.
///
/// Emissions reported for a year are taken to hold until the next reported
/// year, so cumulative emissions integrate the step function.
#[derive(Debug, Clone)]
pub struct CumulativeEmissionsClimate {
    gas: String,
    /// Warming per unit of cumulative emissions.
    response: f64,
    base_temperature: f64,
    temperatures: BTreeMap<Year, f64>,
}

impl CumulativeEmissionsClimate {
    pub fn new(gas: impl Into<String>, response: f64) -> Self {
        Self {
            gas: gas.into(),
            response,
            base_temperature: 0.0,
            temperatures: BTreeMap::new(),
        }
    }

    pub fn with_base_temperature(mut self, temperature: f64) -> Self {
        self.base_temperature = temperature;
        self
    }
}

impl ClimateModel for CumulativeEmissionsClimate {
    fn name(&self) -> &str {
        "cumulative-emissions"
    }

    fn run(&mut self, _artifact: &Path, emissions: &EmissionsSeries) -> Result<(), ClimateError> {
        let series = emissions.series(&self.gas);
        if !self.response.is_finite() {
            return Err(ClimateError::Model {
                model: self.name().to_string(),
                reason: format!("response {} is not finite", self.response),
            });
        }
        self.temperatures.clear();
        let mut cumulative = 0.0;
        for (i, (year, amount)) in series.iter().enumerate() {
            self.temperatures
                .insert(*year, self.base_temperature + self.response * cumulative);
            let span = series
                .get(i + 1)
                .map(|(next, _)| f64::from(next - year))
                .unwrap_or(1.0);
            cumulative += amount * span;
        }
        if let Some((last_year, _)) = series.last() {
            info!(
                gas = %self.gas,
                year = last_year,
                temperature = ?self.temperatures.get(last_year),
                "Climate model run"
            );
        }
        Ok(())
    }

    fn temperature(&self, year: Year) -> Option<f64> {
        self.temperatures.get(&year).copied()
    }
}

/// Position of a trial relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStatus {
    Solved,
    High,
    Low,
    Unknown,
}

/// Target on the temperature reached in a year.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureTarget {
    target: f64,
    initial_year: Year,
    final_year: Year,
}

impl TemperatureTarget {
    pub fn new(target: f64, initial_year: Year, final_year: Year) -> Self {
        Self {
            target,
            initial_year,
            final_year,
        }
    }

    /// Name of the tax a target finder would adjust.
    pub fn tax_name(&self) -> &'static str {
        "CO2"
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Compare the model's temperature in `year` against the target.
    ///
    /// Years outside the target window, and years the model has no value
    /// for, are `Unknown`.
    pub fn status(&self, climate: &dyn ClimateModel, tolerance: f64, year: Year) -> TrialStatus {
        if year < self.initial_year || year > self.final_year {
            return TrialStatus::Unknown;
        }
        let Some(temperature) = climate.temperature(year) else {
            return TrialStatus::Unknown;
        };
        if (temperature - self.target).abs() <= tolerance {
            TrialStatus::Solved
        } else if temperature > self.target {
            TrialStatus::High
        } else {
            TrialStatus::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> EmissionsSeries {
        let mut s = EmissionsSeries::new();
        s.add("CO2", 1975, 1.0);
        s.add("CO2", 1990, 2.0);
        s.add("CO2", 2005, 3.0);
        s
    }

    #[test]
    fn test_cumulative_response() {
        let mut climate = CumulativeEmissionsClimate::new("CO2", 0.01).with_base_temperature(0.5);
        climate.run(Path::new("unused.csv"), &series()).unwrap();
        assert_eq!(climate.temperature(1975), Some(0.5));
        // 1.0 × 15 years
        assert!((climate.temperature(1990).unwrap() - 0.65).abs() < 1e-12);
        // + 2.0 × 15 years
        assert!((climate.temperature(2005).unwrap() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_target_status() {
        let mut climate = CumulativeEmissionsClimate::new("CO2", 0.01);
        climate.run(Path::new("unused.csv"), &series()).unwrap();
        let target = TemperatureTarget::new(0.45, 1975, 2005);

        assert_eq!(target.status(&climate, 0.01, 2005), TrialStatus::Solved);
        assert_eq!(target.status(&climate, 0.01, 1990), TrialStatus::Low);
        let low_target = TemperatureTarget::new(0.1, 1975, 2005);
        assert_eq!(low_target.status(&climate, 0.01, 2005), TrialStatus::High);
        assert_eq!(target.status(&climate, 0.01, 2050), TrialStatus::Unknown);
        assert_eq!(target.status(&NoClimateModel, 0.01, 2005), TrialStatus::Unknown);
    }
}
