//! Calculation context handed to technologies.

use marketplace::{MarketInfo, Marketplace};
use tracing::warn;
use types::{Modeltime, Period};

use crate::LandAllocator;

/// Everything a technology may touch during a calculation pass.
///
/// Built by the owning sector for each call and dropped afterwards, so a
/// technology never keeps a reference to shared model state.
///
/// ```text
/// Region ──owns──► LandAllocator ─┐
/// Scenario ─owns─► Marketplace ───┼──► CalcContext<'a> ──► technology
/// Scenario ─owns─► Modeltime ─────┘     region, sector
/// ```
pub struct CalcContext<'a> {
    pub modeltime: &'a Modeltime,
    pub marketplace: &'a mut Marketplace,
    pub land_allocator: &'a mut dyn LandAllocator,
    pub region: &'a str,
    /// Name of the owning sector, which is also the product name.
    pub sector: &'a str,
}

impl<'a> CalcContext<'a> {
    pub fn new(
        modeltime: &'a Modeltime,
        marketplace: &'a mut Marketplace,
        land_allocator: &'a mut dyn LandAllocator,
        region: &'a str,
        sector: &'a str,
    ) -> Self {
        Self {
            modeltime,
            marketplace,
            land_allocator,
            region,
            sector,
        }
    }

    /// Price of a good in this region, or zero when no such market exists.
    pub fn price(&self, good: &str, period: Period) -> f64 {
        match self.marketplace.price(good, self.region, period) {
            Ok(price) => price,
            Err(err) => {
                warn!(good, region = self.region, period, %err, "Price lookup failed");
                0.0
            }
        }
    }

    /// Add to the supply of a regional market, logging rejected amounts.
    pub fn add_supply(&mut self, good: &str, amount: f64, period: Period) {
        if let Err(err) = self
            .marketplace
            .add_to_supply(good, self.region, amount, period)
        {
            warn!(good, region = self.region, period, %err, "Supply contribution dropped");
        }
    }

    /// Add to the demand of a regional market, logging rejected amounts.
    pub fn add_demand(&mut self, good: &str, amount: f64, period: Period) {
        if let Err(err) = self
            .marketplace
            .add_to_demand(good, self.region, amount, period)
        {
            warn!(good, region = self.region, period, %err, "Demand contribution dropped");
        }
    }

    /// A numeric market-info value, if present.
    pub fn info_value(&self, good: &str, period: Period, name: &str) -> Option<f64> {
        self.marketplace
            .market_info(good, self.region, period)
            .and_then(|info| info.get_double(name))
    }

    /// Mutable market info for a regional good, created on demand.
    ///
    /// Returns `None` only for periods outside the horizon.
    pub fn info_mut(&mut self, good: &str, period: Period) -> Option<&mut MarketInfo> {
        match self
            .marketplace
            .market_info_mut(good, self.region, period, true)
        {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(good, region = self.region, period, %err, "Market info unavailable");
                None
            }
        }
    }

    pub fn final_period(&self) -> Period {
        self.modeltime.final_period()
    }

    pub fn timestep(&self, period: Period) -> u32 {
        self.modeltime.timestep(period)
    }
}
