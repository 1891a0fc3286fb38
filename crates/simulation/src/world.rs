//! The world: every region, driven period by period.

use std::collections::BTreeMap;
use std::io;

use marketplace::Marketplace;
use solver::Calculable;
use types::{Modeltime, Period, ToDebugXml, XmlWriter, Year};

use crate::{EmissionsSeries, Region, Result};

/// Input goods of one sector, for dependency reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorDependency {
    pub region: String,
    pub sector: String,
    pub inputs: Vec<String>,
}

/// Container of all regions.
#[derive(Debug, Default)]
pub struct World {
    regions: Vec<Region>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.add_region(region);
        self
    }

    /// Add a region, replacing any region of the same name.
    pub fn add_region(&mut self, region: Region) {
        match self.regions.iter_mut().find(|r| r.name() == region.name()) {
            Some(existing) => *existing = region,
            None => self.regions.push(region),
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name() == name)
    }

    pub fn complete_init(
        &mut self,
        marketplace: &mut Marketplace,
        modeltime: &Modeltime,
    ) -> Result<()> {
        for region in &mut self.regions {
            region.complete_init(marketplace, modeltime)?;
        }
        Ok(())
    }

    pub fn init_calc(
        &mut self,
        marketplace: &mut Marketplace,
        modeltime: &Modeltime,
        period: Period,
    ) {
        for region in &mut self.regions {
            region.init_calc(marketplace, modeltime, period);
        }
    }

    pub fn calc(&mut self, marketplace: &mut Marketplace, modeltime: &Modeltime, period: Period) {
        for region in &mut self.regions {
            region.calc(marketplace, modeltime, period);
        }
    }

    pub fn update_summary(&mut self, marketplace: &Marketplace, period: Period) {
        for region in &mut self.regions {
            region.update_summary(marketplace, period);
        }
    }

    pub fn emiss_ind(&mut self, period: Period) {
        for region in &mut self.regions {
            region.emiss_ind(period);
        }
    }

    /// World emissions per gas for every completed period.
    pub fn emissions_totals(&self, modeltime: &Modeltime) -> EmissionsSeries {
        let mut series = EmissionsSeries::new();
        for period in modeltime.periods() {
            let year = modeltime.period_to_year(period);
            for region in &self.regions {
                if let Some(emissions) = region.emissions(period) {
                    for (gas, amount) in emissions {
                        series.add(gas, year, *amount);
                    }
                }
            }
        }
        series
    }

    /// Emissions of one gas as a (year, quantity) series per region.
    pub fn emissions_quantity_curves(
        &self,
        gas: &str,
        modeltime: &Modeltime,
    ) -> BTreeMap<String, Vec<(Year, f64)>> {
        self.regions
            .iter()
            .map(|region| {
                let curve = modeltime
                    .periods()
                    .filter_map(|period| {
                        let amount = region.emissions(period)?.get(gas).copied()?;
                        Some((modeltime.period_to_year(period), amount))
                    })
                    .collect();
                (region.name().to_string(), curve)
            })
            .collect()
    }

    pub fn sector_dependencies(&self) -> Vec<SectorDependency> {
        self.regions
            .iter()
            .flat_map(|region| {
                region.sectors().iter().map(|sector| SectorDependency {
                    region: region.name().to_string(),
                    sector: sector.name().to_string(),
                    inputs: sector.input_goods(),
                })
            })
            .collect()
    }
}

impl ToDebugXml for World {
    fn to_debug_xml(&self, period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.open("World", &[])?;
        for region in &self.regions {
            region.to_debug_xml(period, out)?;
        }
        out.close("World")
    }
}

/// Adapter letting the solver re-run the world's calculation.
pub struct WorldCalc<'a> {
    pub world: &'a mut World,
    pub modeltime: &'a Modeltime,
}

impl Calculable for WorldCalc<'_> {
    fn calc(&mut self, marketplace: &mut Marketplace, period: Period) {
        self.world.calc(marketplace, self.modeltime, period);
    }
}
