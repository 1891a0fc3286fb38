//! Price-responsive technology with a single purchased input.

use std::io;

use tracing::trace;
use types::{Period, ToDebugXml, XmlWriter, Year};

use crate::fields::{number, text, Field};
use crate::traits::resolve_vintage;
use crate::{CalcContext, ProducibleTechnology, Result, TechnologyCore};

/// Supplies `capacity × share` where the share rises as the product price
/// moves above the technology's cost.
///
/// ```text
/// cost  = nonEnergyCost + coefficient × price(input)
/// share = clamp(1 − (cost / price)^elasticity, 0, 1)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GenericTechnology {
    core: TechnologyCore,
    non_energy_cost: f64,
    input_good: Option<String>,
    input_coefficient: f64,
    elasticity: f64,
    capacity: f64,
}

impl GenericTechnology {
    pub const XML_NAME: &'static str = "GenericTechnology";

    pub(crate) const FIELDS: &'static [Field<Self>] = &[
        Field::<Self>::new("variableCost", |t, v| {
            t.non_energy_cost = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("nonEnergyCost", |t, v| {
            t.non_energy_cost = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("input", |t, v| {
            t.input_good = Some(text(v)?);
            Ok(())
        }),
        Field::<Self>::new("coefficient", |t, v| {
            t.input_coefficient = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("elasticity", |t, v| {
            t.elasticity = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("capacity", |t, v| {
            t.capacity = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("ghgs", |t, v| {
            t.core.ghgs = crate::fields::ghgs(v)?;
            Ok(())
        }),
    ];

    pub fn new(name: impl Into<String>, year: Year) -> Self {
        Self {
            core: TechnologyCore::new(name, year),
            non_energy_cost: 0.0,
            input_good: None,
            input_coefficient: 0.0,
            elasticity: 1.0,
            capacity: 0.0,
        }
    }

    pub fn with_cost(mut self, non_energy_cost: f64) -> Self {
        self.non_energy_cost = non_energy_cost;
        self
    }

    pub fn with_input(mut self, good: impl Into<String>, coefficient: f64) -> Self {
        self.input_good = Some(good.into());
        self.input_coefficient = coefficient;
        self
    }

    pub fn with_elasticity(mut self, elasticity: f64) -> Self {
        self.elasticity = elasticity;
        self
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    fn calc_cost(&self, ctx: &CalcContext<'_>, period: Period) -> f64 {
        let input_cost = match &self.input_good {
            Some(good) => self.input_coefficient * ctx.price(good, period),
            None => 0.0,
        };
        self.non_energy_cost + input_cost
    }
}

impl ProducibleTechnology for GenericTechnology {
    fn core(&self) -> &TechnologyCore {
        &self.core
    }

    fn xml_name(&self) -> &'static str {
        Self::XML_NAME
    }

    fn complete_init(&mut self, ctx: &mut CalcContext<'_>) -> Result<()> {
        resolve_vintage(&mut self.core, ctx.modeltime)
    }

    fn init_calc(&mut self, _ctx: &mut CalcContext<'_>, _period: Period) {
        self.core.output = 0.0;
        self.core.input = 0.0;
    }

    fn calc_share(&mut self, ctx: &mut CalcContext<'_>, period: Period) -> f64 {
        let cost = self.calc_cost(ctx, period);
        let price = ctx.price(ctx.sector, period);
        self.core.variable_cost = cost;
        self.core.share = if price > 0.0 {
            (1.0 - (cost / price).powf(self.elasticity)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        trace!(technology = %self.core.name, cost, price, share = self.core.share, "Share");
        self.core.share
    }

    fn production(&mut self, ctx: &mut CalcContext<'_>, _demand: f64, period: Period) {
        let output = self.capacity * self.core.share;
        self.core.output = output;
        let sector = ctx.sector;
        ctx.add_supply(sector, output, period);
        if let Some(good) = &self.input_good {
            self.core.input = self.input_coefficient * output;
            ctx.add_demand(good, self.core.input, period);
        }
        self.core.calc_emissions();
    }

    fn input_goods(&self) -> Vec<String> {
        self.input_good.iter().cloned().collect()
    }
}

impl ToDebugXml for GenericTechnology {
    fn to_debug_xml(&self, _period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        let year = self.core.year.to_string();
        out.open(
            Self::XML_NAME,
            &[("name", self.core.name.as_str()), ("year", year.as_str())],
        )?;
        out.element("nonEnergyCost", self.non_energy_cost)?;
        if let Some(good) = &self.input_good {
            out.element_with_attrs(
                "input",
                &[("coefficient", self.input_coefficient.to_string().as_str())],
                good,
            )?;
        }
        out.element("elasticity", self.elasticity)?;
        out.element("capacity", self.capacity)?;
        self.core.write_xml_fields(out)?;
        out.close(Self::XML_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimpleLandAllocator;
    use marketplace::Marketplace;
    use types::Modeltime;

    #[test]
    fn test_share_and_input_demand() {
        let modeltime = Modeltime::new(1975, 1990, 15).unwrap();
        let mut mp = Marketplace::new(modeltime.max_period());
        mp.create_market("Paper", "USA", 4.0, true);
        mp.create_market("Pulp", "USA", 1.0, false);
        let mut land = SimpleLandAllocator::new();
        let mut ctx = CalcContext::new(&modeltime, &mut mp, &mut land, "USA", "Paper");

        let mut tech = GenericTechnology::new("Mill", 1975)
            .with_cost(1.0)
            .with_input("Pulp", 1.0)
            .with_capacity(10.0);
        tech.complete_init(&mut ctx).unwrap();
        // cost = 1 + 1 × 1 = 2, share = 1 − 2/4
        let share = tech.calc_share(&mut ctx, 0);
        assert!((share - 0.5).abs() < 1e-12);
        tech.production(&mut ctx, 0.0, 0);
        drop(ctx);

        assert!((mp.supply("Paper", "USA", 0).unwrap() - 5.0).abs() < 1e-9);
        assert!((mp.demand("Pulp", "USA", 0).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_share_zero_when_price_below_cost() {
        let modeltime = Modeltime::new(1975, 1990, 15).unwrap();
        let mut mp = Marketplace::new(modeltime.max_period());
        mp.create_market("Paper", "USA", 1.0, true);
        let mut land = SimpleLandAllocator::new();
        let mut ctx = CalcContext::new(&modeltime, &mut mp, &mut land, "USA", "Paper");

        let mut tech = GenericTechnology::new("Mill", 1975).with_cost(3.0);
        assert_eq!(tech.calc_share(&mut ctx, 0), 0.0);
    }

    #[test]
    fn test_vintage_outside_horizon_rejected() {
        let modeltime = Modeltime::new(1975, 1990, 15).unwrap();
        let mut mp = Marketplace::new(modeltime.max_period());
        let mut land = SimpleLandAllocator::new();
        let mut ctx = CalcContext::new(&modeltime, &mut mp, &mut land, "USA", "Paper");
        let mut tech = GenericTechnology::new("Mill", 2050);
        assert!(tech.complete_init(&mut ctx).is_err());
    }
}
