//! The technology trait implemented by every production variant.

use std::fmt;

use types::{Modeltime, Period, ToDebugXml, Year};

use crate::{CalcContext, Result, TechnologyError, TechnologyCore};

/// A technology producing its sector's product.
///
/// The owning sector drives each operating vintage through
/// `init_calc` once per period, then `calc_share` and `production` once per
/// solver trial. All shared state comes in through [`CalcContext`].
///
/// # Lifecycle
///
/// ```text
/// parsed ──complete_init──► calibrated ──init_calc(p)──► active in p ──► retired
///                                        (own period only)
/// ```
pub trait ProducibleTechnology: ToDebugXml + fmt::Debug + Send + Sync {
    fn core(&self) -> &TechnologyCore;

    /// Tag used for this variant in input and debug documents.
    fn xml_name(&self) -> &'static str;

    /// One-time setup after the world is built.
    fn complete_init(&mut self, ctx: &mut CalcContext<'_>) -> Result<()>;

    /// Once-per-period setup before the first trial.
    fn init_calc(&mut self, ctx: &mut CalcContext<'_>, period: Period);

    /// Unnormalized share of sector output.
    fn calc_share(&mut self, ctx: &mut CalcContext<'_>, period: Period) -> f64;

    /// Compute output for one trial and post it to the marketplace.
    fn production(&mut self, ctx: &mut CalcContext<'_>, demand: f64, period: Period);

    fn name(&self) -> &str {
        &self.core().name
    }

    fn year(&self) -> Year {
        self.core().year
    }

    /// Period this vintage operates in.
    fn vintage(&self) -> Period {
        self.core().period
    }

    fn is_operating(&self, period: Period) -> bool {
        self.core().is_operating(period)
    }

    fn output(&self) -> f64 {
        self.core().output
    }

    fn input(&self) -> f64 {
        self.core().input
    }

    /// Emissions per gas from the last production call.
    fn emissions(&self) -> Vec<(String, f64)> {
        self.core().emissions()
    }

    /// Goods bought from other markets.
    fn input_goods(&self) -> Vec<String> {
        Vec::new()
    }

    /// Market receiving supply planted now for a later harvest.
    fn future_market(&self, _product: &str) -> Option<String> {
        None
    }

    /// Period in which output planted in `period` is harvested.
    fn harvest_period(&self, _modeltime: &Modeltime, period: Period) -> Period {
        period
    }
}

/// Resolve a vintage year to its model period.
pub(crate) fn resolve_vintage(core: &mut TechnologyCore, modeltime: &Modeltime) -> Result<()> {
    core.period = modeltime.year_to_period(core.year).ok_or_else(|| {
        TechnologyError::YearOutsideHorizon {
            technology: core.name.clone(),
            year: core.year,
        }
    })?;
    Ok(())
}
