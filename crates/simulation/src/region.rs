//! A region: sectors plus the land they share.

use std::collections::BTreeMap;
use std::io;

use marketplace::Marketplace;
use serde::Deserialize;
use technologies::LandAllocator;
use tracing::debug;
use types::{Modeltime, Period, ToDebugXml, XmlWriter};

use crate::{Result, ScenarioError, Sector};

/// A market registered by the region itself rather than by a sector,
/// e.g. a fixed-price input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketSpec {
    pub good: String,
    pub price: f64,
    #[serde(default)]
    pub solvable: bool,
}

/// One region of the world.
#[derive(Debug)]
pub struct Region {
    name: String,
    land_allocator: Box<dyn LandAllocator>,
    sectors: Vec<Sector>,
    markets: Vec<MarketSpec>,
    /// Emissions per gas for each completed period.
    emissions: BTreeMap<Period, BTreeMap<String, f64>>,
}

impl Region {
    pub fn new(name: impl Into<String>, land_allocator: Box<dyn LandAllocator>) -> Self {
        Self {
            name: name.into(),
            land_allocator,
            sectors: Vec::new(),
            markets: Vec::new(),
            emissions: BTreeMap::new(),
        }
    }

    pub fn with_sector(mut self, sector: Sector) -> Self {
        self.sectors.push(sector);
        self
    }

    pub fn with_market(mut self, market: MarketSpec) -> Self {
        self.markets.push(market);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector(&self, name: &str) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.name() == name)
    }

    pub fn land_allocator(&self) -> &dyn LandAllocator {
        self.land_allocator.as_ref()
    }

    pub fn emissions(&self, period: Period) -> Option<&BTreeMap<String, f64>> {
        self.emissions.get(&period)
    }

    /// Register markets, write calibration info and initialize technologies.
    pub fn complete_init(
        &mut self,
        marketplace: &mut Marketplace,
        modeltime: &Modeltime,
    ) -> Result<()> {
        for market in &self.markets {
            marketplace.create_market(&market.good, &self.name, market.price, market.solvable);
        }
        for sector in &self.sectors {
            marketplace.create_market(sector.name(), &self.name, sector.price(), true);
            if let Some(future_market) = sector.future_market() {
                marketplace.create_market(&future_market, &self.name, sector.future_price(), true);
            }
        }
        for sector in &self.sectors {
            for good in sector.input_goods() {
                if !marketplace.has_market(&good, &self.name) {
                    return Err(ScenarioError::UnknownInputGood {
                        region: self.name.clone(),
                        sector: sector.name().to_string(),
                        good,
                    });
                }
            }
            sector.set_calibration_info(marketplace, modeltime, &self.name)?;
        }
        for sector in &mut self.sectors {
            sector
                .complete_init(modeltime, marketplace, self.land_allocator.as_mut(), &self.name)
                .map_err(|source| ScenarioError::Technology {
                    region: self.name.clone(),
                    sector: sector.name().to_string(),
                    source,
                })?;
        }
        debug!(region = %self.name, sectors = self.sectors.len(), "Region initialized");
        Ok(())
    }

    pub fn init_calc(
        &mut self,
        marketplace: &mut Marketplace,
        modeltime: &Modeltime,
        period: Period,
    ) {
        for sector in &mut self.sectors {
            let land = self.land_allocator.as_mut();
            sector.init_calc(modeltime, marketplace, land, &self.name, period);
        }
    }

    pub fn calc(&mut self, marketplace: &mut Marketplace, modeltime: &Modeltime, period: Period) {
        for sector in &mut self.sectors {
            sector.calc(modeltime, marketplace, self.land_allocator.as_mut(), &self.name, period);
        }
    }

    pub fn update_summary(&mut self, marketplace: &Marketplace, period: Period) {
        for sector in &mut self.sectors {
            sector.update_summary(marketplace, &self.name, period);
        }
    }

    /// Total emissions per gas over all sectors.
    pub fn emiss_ind(&mut self, period: Period) {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for sector in &self.sectors {
            for (gas, amount) in sector.emissions(period) {
                *totals.entry(gas).or_insert(0.0) += amount;
            }
        }
        self.emissions.insert(period, totals);
    }
}

impl ToDebugXml for Region {
    fn to_debug_xml(&self, period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.open("Region", &[("name", self.name.as_str())])?;
        for sector in &self.sectors {
            sector.to_debug_xml(period, out)?;
        }
        if let Some(emissions) = self.emissions.get(&period) {
            for (gas, amount) in emissions {
                out.element_with_attrs("emissions", &[("gas", gas.as_str())], amount)?;
            }
        }
        out.close("Region")
    }
}
