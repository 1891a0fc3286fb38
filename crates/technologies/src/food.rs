//! Land-based production harvested in the period it is planted.

use std::io;

use tracing::trace;
use types::{Period, ToDebugXml, XmlWriter, Year};

use crate::fields::{ghgs, number, text, Field};
use crate::traits::resolve_vintage;
use crate::{CalcContext, LandUsageKind, ProducibleTechnology, Result, TechnologyCore};

/// Land and calibration state shared by the food and forest variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodProduction {
    pub land_type: String,
    /// Calibrated production in the vintage's period.
    pub cal_production: Option<f64>,
    /// Calibrated yield in the vintage's period.
    pub cal_yield: Option<f64>,
    /// Yearly yield growth rate.
    pub ag_prod_change: f64,
    /// Yield pushed to the land allocator for the vintage's own period.
    pub cal_observed_yield: Option<f64>,
}

impl FoodProduction {
    pub fn is_calibrated(&self) -> bool {
        self.cal_production.is_some() && self.cal_yield.is_some()
    }

    /// Profit per unit output at the price of `product`.
    pub fn calc_profit_rate(
        &self,
        core: &TechnologyCore,
        ctx: &CalcContext<'_>,
        product: &str,
        period: Period,
    ) -> f64 {
        ctx.price(product, period) - core.variable_cost
    }

    /// Harvested output in `period`: allocated land times yield.
    pub fn calc_supply(&self, ctx: &CalcContext<'_>, name: &str, period: Period) -> f64 {
        let land = ctx.land_allocator.land_allocation(&self.land_type, name, period);
        let yield_ = ctx.land_allocator.yield_for(&self.land_type, name, period);
        land * yield_
    }

    /// Push the profit rate to the land allocator as the intrinsic rate.
    pub fn set_intrinsic_rate(
        &self,
        ctx: &mut CalcContext<'_>,
        name: &str,
        profit_rate: f64,
        period: Period,
    ) {
        let region = ctx.region;
        ctx.land_allocator.set_intrinsic_rate(
            region,
            &self.land_type,
            name,
            profit_rate.max(0.0),
            period,
        );
    }

    pub fn apply_ag_prod_change(&self, ctx: &mut CalcContext<'_>, name: &str, period: Period) {
        let timestep = ctx.timestep(period);
        ctx.land_allocator
            .apply_ag_prod_change(&self.land_type, name, self.ag_prod_change, period, timestep);
    }

    pub(crate) fn write_xml_fields(&self, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.element("landType", &self.land_type)?;
        if let Some(value) = self.cal_production {
            out.element("calProduction", value)?;
        }
        if let Some(value) = self.cal_yield {
            out.element("calYield", value)?;
        }
        out.element("agProdChange", self.ag_prod_change)
    }
}

/// A crop: profit at the current price decides land, harvested at once.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodProductionTechnology {
    core: TechnologyCore,
    food: FoodProduction,
}

impl FoodProductionTechnology {
    pub const XML_NAME: &'static str = "FoodProductionTechnology";

    pub(crate) const FIELDS: &'static [Field<Self>] = &[
        Field::<Self>::new("landType", |t, v| {
            t.food.land_type = text(v)?;
            Ok(())
        }),
        Field::<Self>::new("variableCost", |t, v| {
            t.core.variable_cost = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("calProduction", |t, v| {
            t.food.cal_production = Some(number(v)?);
            Ok(())
        }),
        Field::<Self>::new("calYield", |t, v| {
            let value = number(v)?;
            if value <= 0.0 {
                return Err(format!("calibrated yield must be positive, got {value}"));
            }
            t.food.cal_yield = Some(value);
            Ok(())
        }),
        Field::<Self>::new("agProdChange", |t, v| {
            t.food.ag_prod_change = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("ghgs", |t, v| {
            t.core.ghgs = ghgs(v)?;
            Ok(())
        }),
    ];

    pub fn new(name: impl Into<String>, year: Year, land_type: impl Into<String>) -> Self {
        Self {
            core: TechnologyCore::new(name, year),
            food: FoodProduction {
                land_type: land_type.into(),
                ..FoodProduction::default()
            },
        }
    }

    pub fn with_variable_cost(mut self, cost: f64) -> Self {
        self.core.variable_cost = cost;
        self
    }

    pub fn with_calibration(mut self, production: f64, yield_: f64) -> Self {
        self.food.cal_production = Some(production);
        self.food.cal_yield = Some(yield_);
        self
    }

    pub fn food(&self) -> &FoodProduction {
        &self.food
    }

    fn set_cal_land_values(&mut self, ctx: &mut CalcContext<'_>) {
        let (Some(production), Some(yield_)) = (self.food.cal_production, self.food.cal_yield)
        else {
            return;
        };
        let period = self.core.period;
        let land = &self.food.land_type;
        ctx.land_allocator
            .set_cal_land_allocation(land, &self.core.name, production / yield_, period, period);
        ctx.land_allocator
            .set_cal_observed_yield(land, &self.core.name, yield_, period);
        self.food.cal_observed_yield = Some(yield_);
    }
}

impl ProducibleTechnology for FoodProductionTechnology {
    fn core(&self) -> &TechnologyCore {
        &self.core
    }

    fn xml_name(&self) -> &'static str {
        Self::XML_NAME
    }

    fn complete_init(&mut self, ctx: &mut CalcContext<'_>) -> Result<()> {
        resolve_vintage(&mut self.core, ctx.modeltime)?;
        ctx.land_allocator
            .add_land_usage(&self.food.land_type, &self.core.name, LandUsageKind::Crop)?;
        self.set_cal_land_values(ctx);
        Ok(())
    }

    fn init_calc(&mut self, ctx: &mut CalcContext<'_>, period: Period) {
        if self.core.period > 0 {
            self.food.apply_ag_prod_change(ctx, &self.core.name, period);
        }
        self.set_cal_land_values(ctx);
    }

    fn calc_share(&mut self, ctx: &mut CalcContext<'_>, period: Period) -> f64 {
        let product = ctx.sector;
        let profit = self.food.calc_profit_rate(&self.core, ctx, product, period);
        self.food.set_intrinsic_rate(ctx, &self.core.name, profit, period);
        self.core.share = 1.0;
        self.core.share
    }

    fn production(&mut self, ctx: &mut CalcContext<'_>, _demand: f64, period: Period) {
        let product = ctx.sector;
        let profit = self.food.calc_profit_rate(&self.core, ctx, product, period);
        ctx.land_allocator
            .calc_yield(&self.food.land_type, &self.core.name, profit, period, period);
        self.core.output = self.food.calc_supply(ctx, &self.core.name, period);
        ctx.add_supply(product, self.core.output, period);
        self.core.input = ctx
            .land_allocator
            .land_allocation(&self.food.land_type, &self.core.name, period);
        self.core.calc_emissions();
        trace!(
            technology = %self.core.name,
            period,
            profit,
            output = self.core.output,
            "Food production"
        );
    }
}

impl ToDebugXml for FoodProductionTechnology {
    fn to_debug_xml(&self, _period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        let year = self.core.year.to_string();
        out.open(
            Self::XML_NAME,
            &[("name", self.core.name.as_str()), ("year", year.as_str())],
        )?;
        self.food.write_xml_fields(out)?;
        self.core.write_xml_fields(out)?;
        out.close(Self::XML_NAME)
    }
}
