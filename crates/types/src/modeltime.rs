//! Mapping between model periods and calendar years.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Period, Year};

/// Errors raised when building a [`Modeltime`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeltimeError {
    /// The timestep must be at least one year.
    #[error("timestep must be positive, got {0}")]
    InvalidTimestep(u32),
    /// The end year lies before the start year.
    #[error("end year {end} is before start year {start}")]
    EndBeforeStart { start: Year, end: Year },
    /// The span between start and end is not a whole number of timesteps.
    #[error("span {start}..{end} is not a multiple of the {timestep} year timestep")]
    RaggedSpan { start: Year, end: Year, timestep: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModeltimeInput {
    start_year: Year,
    end_year: Year,
    timestep: u32,
}

/// Model time with a constant timestep.
///
/// Period `0` is the start year; period `max_period() - 1` is the end year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ModeltimeInput", into = "ModeltimeInput")]
pub struct Modeltime {
    start_year: Year,
    end_year: Year,
    timestep: u32,
}

impl TryFrom<ModeltimeInput> for Modeltime {
    type Error = ModeltimeError;

    fn try_from(input: ModeltimeInput) -> Result<Self, Self::Error> {
        Modeltime::new(input.start_year, input.end_year, input.timestep)
    }
}

impl From<Modeltime> for ModeltimeInput {
    fn from(modeltime: Modeltime) -> Self {
        Self {
            start_year: modeltime.start_year,
            end_year: modeltime.end_year,
            timestep: modeltime.timestep,
        }
    }
}

impl Modeltime {
    /// Create a model time spanning `start_year..=end_year`.
    pub fn new(start_year: Year, end_year: Year, timestep: u32) -> Result<Self, ModeltimeError> {
        if timestep == 0 {
            return Err(ModeltimeError::InvalidTimestep(timestep));
        }
        if end_year < start_year {
            return Err(ModeltimeError::EndBeforeStart {
                start: start_year,
                end: end_year,
            });
        }
        if (end_year - start_year) % timestep as Year != 0 {
            return Err(ModeltimeError::RaggedSpan {
                start: start_year,
                end: end_year,
                timestep,
            });
        }
        Ok(Self {
            start_year,
            end_year,
            timestep,
        })
    }

    /// First model year.
    pub fn start_year(&self) -> Year {
        self.start_year
    }

    /// Last model year.
    pub fn end_year(&self) -> Year {
        self.end_year
    }

    /// Number of periods in the run.
    pub fn max_period(&self) -> Period {
        ((self.end_year - self.start_year) / self.timestep as Year) as Period + 1
    }

    /// Index of the last period.
    pub fn final_period(&self) -> Period {
        self.max_period() - 1
    }

    /// Years per period. The timestep is constant, so the period is unused.
    pub fn timestep(&self, _period: Period) -> u32 {
        self.timestep
    }

    /// Calendar year of a period.
    pub fn period_to_year(&self, period: Period) -> Year {
        self.start_year + period as Year * self.timestep as Year
    }

    /// Period containing a calendar year, or `None` outside the run.
    pub fn year_to_period(&self, year: Year) -> Option<Period> {
        if year < self.start_year || year > self.end_year {
            return None;
        }
        Some(((year - self.start_year) / self.timestep as Year) as Period)
    }

    /// Iterate over all periods in order.
    pub fn periods(&self) -> impl Iterator<Item = Period> {
        0..self.max_period()
    }
}
