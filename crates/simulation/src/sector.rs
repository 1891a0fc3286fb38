//! A sector: final demand for one product and the technologies supplying it.

use std::collections::BTreeMap;
use std::io;

use marketplace::Marketplace;
use technologies::{CalcContext, LandAllocator, ProducibleTechnology, CAL_PRICE, CAL_SUPPLY};
use tracing::{trace, warn};
use types::{Modeltime, Period, ToDebugXml, XmlWriter, Year};

/// Per-period results kept for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SectorSummary {
    pub price: f64,
    pub output: f64,
    pub demand: f64,
}

/// Constant-elasticity final demand.
///
/// `demand(p, t) = base × (1 + growth)^(years since start) × (p / base_price)^(−elasticity)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandCurve {
    pub base_demand: f64,
    pub base_price: f64,
    pub elasticity: f64,
    /// Yearly growth of the base demand.
    pub growth: f64,
}

impl DemandCurve {
    pub fn at(&self, price: f64, years_from_start: i32) -> f64 {
        let base = self.base_demand * (1.0 + self.growth).powi(years_from_start);
        if price <= 0.0 || self.base_price <= 0.0 {
            return base;
        }
        base * (price / self.base_price).powf(-self.elasticity)
    }
}

/// One product in one region.
#[derive(Debug)]
pub struct Sector {
    name: String,
    /// Starting price of the product market.
    price: f64,
    /// Starting price of the product's future market, when one exists.
    future_price: Option<f64>,
    demand: DemandCurve,
    /// Observed prices by year, pushed to market info as `calPrice`.
    calibrated_prices: BTreeMap<Year, f64>,
    technologies: Vec<Box<dyn ProducibleTechnology>>,
    summaries: BTreeMap<Period, SectorSummary>,
    last_demand: f64,
}

impl Sector {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            future_price: None,
            demand: DemandCurve {
                base_demand: 0.0,
                base_price: price,
                elasticity: 0.0,
                growth: 0.0,
            },
            calibrated_prices: BTreeMap::new(),
            technologies: Vec::new(),
            summaries: BTreeMap::new(),
            last_demand: 0.0,
        }
    }

    /// Set the final demand at the starting price.
    pub fn with_demand(mut self, base_demand: f64, elasticity: f64) -> Self {
        self.demand.base_demand = base_demand;
        self.demand.elasticity = elasticity;
        self
    }

    pub fn with_demand_growth(mut self, growth: f64) -> Self {
        self.demand.growth = growth;
        self
    }

    pub fn with_future_price(mut self, price: f64) -> Self {
        self.future_price = Some(price);
        self
    }

    pub fn with_calibrated_price(mut self, year: Year, price: f64) -> Self {
        self.calibrated_prices.insert(year, price);
        self
    }

    pub fn with_technology(mut self, technology: Box<dyn ProducibleTechnology>) -> Self {
        self.technologies.push(technology);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn future_price(&self) -> f64 {
        self.future_price.unwrap_or(self.price)
    }

    pub fn technologies(&self) -> &[Box<dyn ProducibleTechnology>] {
        &self.technologies
    }

    pub fn summary(&self, period: Period) -> Option<&SectorSummary> {
        self.summaries.get(&period)
    }

    /// Future market used by any technology of this sector.
    pub fn future_market(&self) -> Option<String> {
        self.technologies
            .iter()
            .find_map(|tech| tech.future_market(&self.name))
    }

    /// Goods bought by the sector's technologies, deduplicated.
    pub fn input_goods(&self) -> Vec<String> {
        let mut goods: Vec<String> = self
            .technologies
            .iter()
            .flat_map(|tech| tech.input_goods())
            .collect();
        goods.sort();
        goods.dedup();
        goods
    }

    /// Push calibration prices into market info.
    pub fn set_calibration_info(
        &self,
        marketplace: &mut Marketplace,
        modeltime: &Modeltime,
        region: &str,
    ) -> marketplace::Result<()> {
        for (year, price) in &self.calibrated_prices {
            let Some(period) = modeltime.year_to_period(*year) else {
                warn!(
                    region,
                    sector = %self.name,
                    year,
                    "Calibration year outside the model horizon"
                );
                continue;
            };
            marketplace
                .market_info_mut(&self.name, region, period, true)?
                .set_double(CAL_PRICE, *price);
        }
        Ok(())
    }

    pub fn complete_init(
        &mut self,
        modeltime: &Modeltime,
        marketplace: &mut Marketplace,
        land_allocator: &mut dyn LandAllocator,
        region: &str,
    ) -> technologies::Result<()> {
        let mut ctx = CalcContext::new(modeltime, marketplace, land_allocator, region, &self.name);
        for tech in &mut self.technologies {
            tech.complete_init(&mut ctx)?;
        }
        Ok(())
    }

    pub fn init_calc(
        &mut self,
        modeltime: &Modeltime,
        marketplace: &mut Marketplace,
        land_allocator: &mut dyn LandAllocator,
        region: &str,
        period: Period,
    ) {
        let mut ctx = CalcContext::new(modeltime, marketplace, land_allocator, region, &self.name);
        for tech in self.technologies.iter_mut().filter(|t| t.is_operating(period)) {
            tech.init_calc(&mut ctx, period);
        }
    }

    /// Post final demand and let every operating technology produce.
    pub fn calc(
        &mut self,
        modeltime: &Modeltime,
        marketplace: &mut Marketplace,
        land_allocator: &mut dyn LandAllocator,
        region: &str,
        period: Period,
    ) {
        let years = modeltime.period_to_year(period) - modeltime.start_year();
        let mut ctx = CalcContext::new(modeltime, marketplace, land_allocator, region, &self.name);

        let price = ctx.price(&self.name, period);
        let demand = self.demand.at(price, years);
        self.last_demand = demand;
        ctx.add_demand(&self.name, demand, period);

        self.post_future_demand(&mut ctx, period);

        let mut shares = Vec::with_capacity(self.technologies.len());
        for tech in self.technologies.iter_mut() {
            let share = if tech.is_operating(period) {
                tech.calc_share(&mut ctx, period)
            } else {
                0.0
            };
            shares.push(share);
        }
        let total: f64 = shares.iter().sum();
        for (tech, share) in self.technologies.iter_mut().zip(shares) {
            if !tech.is_operating(period) {
                continue;
            }
            let tech_demand = if total > 0.0 { demand * share / total } else { 0.0 };
            tech.production(&mut ctx, tech_demand, period);
        }
        trace!(region, sector = %self.name, period, price, demand, "Sector calc");
    }

    /// Demand for output delivered a rotation from now.
    ///
    /// Calibrated periods use the stored `calSupply`; otherwise the final
    /// demand curve is projected to the harvest period at the future price.
    fn post_future_demand(&self, ctx: &mut CalcContext<'_>, period: Period) {
        let Some(tech) = self
            .technologies
            .iter()
            .find(|t| t.is_operating(period) && t.future_market(&self.name).is_some())
        else {
            return;
        };
        let Some(future_market) = tech.future_market(&self.name) else {
            return;
        };
        let harvest = tech.harvest_period(ctx.modeltime, period);
        if harvest > ctx.final_period() {
            return;
        }
        let demand = match ctx.info_value(&future_market, period, CAL_SUPPLY) {
            Some(calibrated) => calibrated,
            None => {
                let years = ctx.modeltime.period_to_year(harvest) - ctx.modeltime.start_year();
                let future_price = ctx.price(&future_market, period);
                let curve = DemandCurve {
                    base_price: self.future_price(),
                    ..self.demand
                };
                curve.at(future_price, years)
            }
        };
        ctx.add_demand(&future_market, demand, period);
    }

    pub fn update_summary(&mut self, marketplace: &Marketplace, region: &str, period: Period) {
        let price = marketplace.price(&self.name, region, period).unwrap_or(0.0);
        let output = self
            .technologies
            .iter()
            .filter(|t| t.is_operating(period))
            .map(|t| t.output())
            .sum();
        self.summaries.insert(
            period,
            SectorSummary {
                price,
                output,
                demand: self.last_demand,
            },
        );
    }

    /// Emissions of operating technologies, summed per gas.
    pub fn emissions(&self, period: Period) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for tech in self.technologies.iter().filter(|t| t.is_operating(period)) {
            for (gas, amount) in tech.emissions() {
                *totals.entry(gas).or_insert(0.0) += amount;
            }
        }
        totals
    }
}

impl ToDebugXml for Sector {
    fn to_debug_xml(&self, period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.open("Sector", &[("name", self.name.as_str())])?;
        if let Some(summary) = self.summaries.get(&period) {
            out.element("price", summary.price)?;
            out.element("output", summary.output)?;
            out.element("demand", summary.demand)?;
        }
        for tech in self.technologies.iter().filter(|t| t.is_operating(period)) {
            tech.to_debug_xml(period, out)?;
        }
        out.close("Sector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_curve() {
        let curve = DemandCurve {
            base_demand: 100.0,
            base_price: 2.0,
            elasticity: 1.0,
            growth: 0.0,
        };
        assert_eq!(curve.at(2.0, 0), 100.0);
        assert_eq!(curve.at(4.0, 0), 50.0);
        // Non-positive price falls back to the base quantity.
        assert_eq!(curve.at(0.0, 0), 100.0);

        let growing = DemandCurve { growth: 0.1, ..curve };
        assert!((growing.at(2.0, 2) - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_prices_written_to_market_info() {
        let modeltime = Modeltime::new(1975, 2005, 15).unwrap();
        let mut mp = Marketplace::new(modeltime.max_period());
        let sector = Sector::new("Forest", 2.0)
            .with_calibrated_price(1975, 2.5)
            .with_calibrated_price(2100, 9.0);
        sector.set_calibration_info(&mut mp, &modeltime, "USA").unwrap();
        let info = mp.market_info("Forest", "USA", 0).unwrap();
        assert_eq!(info.get_double(CAL_PRICE), Some(2.5));
    }
}
