//! Scenario input documents.
//!
//! A run reads one base document and any number of add-ons, applied in
//! order. Regions in an add-on replace regions of the same name.
//!
//! ```json
//! {
//!   "name": "reference",
//!   "modeltime": { "startYear": 1975, "endYear": 2020, "timestep": 15 },
//!   "regions": [{
//!     "name": "USA",
//!     "landTypes": { "Forest": { "totalArea": 100.0, "unmanagedRate": 0.5 } },
//!     "markets": [{ "good": "Electricity", "price": 1.0 }],
//!     "sectors": [{
//!       "name": "Forest", "price": 2.0, "baseDemand": 10.0,
//!       "technologies": [{ "type": "ForestProductionTechnology", "year": 1975, ... }]
//!     }]
//!   }]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use technologies::{parse_technology, LandType, SimpleLandAllocator};
use types::{Modeltime, Year};

use crate::{InputError, MarketSpec, Region, Sector};

/// A whole input document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modeltime: Option<Modeltime>,
    #[serde(default)]
    pub regions: Vec<RegionInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionInput {
    pub name: String,
    #[serde(default)]
    pub land_types: BTreeMap<String, LandType>,
    #[serde(default)]
    pub markets: Vec<MarketSpec>,
    #[serde(default)]
    pub sectors: Vec<SectorInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorInput {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub future_price: Option<f64>,
    #[serde(default)]
    pub base_demand: f64,
    #[serde(default)]
    pub demand_elasticity: f64,
    #[serde(default)]
    pub demand_growth: f64,
    /// Observed prices keyed by year.
    #[serde(default)]
    pub calibrated_prices: BTreeMap<Year, f64>,
    /// Technology objects, parsed through the technology field tables.
    #[serde(default)]
    pub technologies: Vec<Value>,
}

impl ScenarioInput {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| InputError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build every region of the document.
    pub fn build_regions(&self) -> Result<Vec<Region>, InputError> {
        self.regions.iter().map(RegionInput::build).collect()
    }
}

impl RegionInput {
    pub fn build(&self) -> Result<Region, InputError> {
        let land = self
            .land_types
            .iter()
            .fold(SimpleLandAllocator::new(), |land, (name, land_type)| {
                land.with_land_type(name.clone(), land_type.clone())
            });
        let mut region = Region::new(self.name.clone(), Box::new(land));
        for market in &self.markets {
            region = region.with_market(market.clone());
        }
        for sector in &self.sectors {
            region = region.with_sector(sector.build(&self.name)?);
        }
        Ok(region)
    }
}

impl SectorInput {
    pub fn build(&self, region: &str) -> Result<Sector, InputError> {
        let mut sector = Sector::new(self.name.clone(), self.price)
            .with_demand(self.base_demand, self.demand_elasticity)
            .with_demand_growth(self.demand_growth);
        if let Some(price) = self.future_price {
            sector = sector.with_future_price(price);
        }
        for (year, price) in &self.calibrated_prices {
            sector = sector.with_calibrated_price(*year, *price);
        }
        for value in &self.technologies {
            let technology = parse_technology(value).map_err(|source| InputError::Technology {
                region: region.to_string(),
                sector: self.name.clone(),
                source,
            })?;
            sector = sector.with_technology(technology);
        }
        Ok(sector)
    }
}
