//! Forestry: land planted now is harvested a rotation later.
//!
//! A forest vintage sells twice in its period:
//!
//! ```text
//!          period p                                   period h = p + R/T
//!  ┌────────────────────────────┐               ┌──────────────────────────┐
//!  │ plant land from profit at  │  ── rotation ─►│ land harvested × yield(h) │
//!  │ price("Future"+product, p) │               │   = output posted in h    │
//!  │ post planted × yield(h) to │               └──────────────────────────┘
//!  │ the future market of p     │
//!  │ post harvest of land       │
//!  │ planted in p − R/T         │
//!  └────────────────────────────┘
//! ```
//!
//! Profit on the future market is discounted over the rotation with
//! [`discount_factor`]. Calibration pushes the pre-existing stand into the
//! land allocator for every harvest period up to one rotation ahead, and is
//! repeated at every `init_calc` so trials in earlier periods cannot disturb
//! it.

use std::io;

use tracing::{debug, trace, warn};
use types::{Modeltime, Period, ToDebugXml, XmlWriter, Year};

use crate::fields::{ghgs, integer, number, text, Field};
use crate::food::FoodProduction;
use crate::traits::resolve_vintage;
use crate::{CalcContext, LandUsageKind, ProducibleTechnology, Result, TechnologyCore};

/// Prefix naming the market for output delivered a rotation later.
pub const FUTURE_MARKET_PREFIX: &str = "Future";

/// Default interest rate used to discount future harvests.
pub const DEFAULT_INTEREST_RATE: f64 = 0.02;

/// Market-info key holding the observed price of a calibrated product.
pub const CAL_PRICE: &str = "calPrice";
/// Market-info key carrying the calibrated variable cost forward.
pub const CAL_VAR_COST: &str = "calVarCost";
/// Market-info key holding calibrated demand on a future market.
pub const CAL_SUPPLY: &str = "calSupply";

/// Name of the future market for a product.
pub fn future_market_name(product: &str) -> String {
    format!("{FUTURE_MARKET_PREFIX}{product}")
}

/// Annuity factor spreading a harvest value over a rotation:
/// `r / ((1 + r)^R − 1)`.
///
/// Returns `1 / R` as `r` approaches zero and `1` for a zero-length rotation.
pub fn discount_factor(interest_rate: f64, rotation_years: u32) -> f64 {
    if rotation_years == 0 {
        return 1.0;
    }
    if interest_rate.abs() < 1e-9 {
        return 1.0 / f64::from(rotation_years);
    }
    let rotation = i32::try_from(rotation_years).unwrap_or(i32::MAX);
    interest_rate / ((1.0 + interest_rate).powi(rotation) - 1.0)
}

/// One vintage of a forest product.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestProductionTechnology {
    core: TechnologyCore,
    food: FoodProduction,
    /// Years from planting to harvest.
    rotation_period: u32,
    interest_rate: f64,
    /// Calibrated production one rotation ahead.
    future_production: Option<f64>,
    /// Future supply posted in the last trial.
    future_supply: f64,
}

impl ForestProductionTechnology {
    pub const XML_NAME: &'static str = "ForestProductionTechnology";

    pub(crate) const FIELDS: &'static [Field<Self>] = &[
        Field::<Self>::new("landType", |t, v| {
            t.food.land_type = text(v)?;
            Ok(())
        }),
        Field::<Self>::new("variableCost", |t, v| {
            t.core.variable_cost = number(v)?;
            Ok(())
        }),
        Field::<Self>::new("rotationPeriod", |t, v| {
            t.rotation_period = u32::try_from(integer(v)?)
                .map_err(|_| "rotation period must be a non-negative integer".to_string())?;
            Ok(())
        }),
        Field::<Self>::new("interestRate", |t, v| {
            let value = number(v)?;
            if value <= -1.0 {
                return Err(format!("interest rate must exceed -1, got {value}"));
            }
            t.interest_rate = value;
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
        Field::<Self>::new("futureProduction", |t, v| {
            t.future_production = Some(number(v)?);
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

    pub fn new(
        name: impl Into<String>,
        year: Year,
        land_type: impl Into<String>,
        rotation_period: u32,
    ) -> Self {
        Self {
            core: TechnologyCore::new(name, year),
            food: FoodProduction {
                land_type: land_type.into(),
                ..FoodProduction::default()
            },
            rotation_period,
            interest_rate: DEFAULT_INTEREST_RATE,
            future_production: None,
            future_supply: 0.0,
        }
    }

    pub fn with_variable_cost(mut self, cost: f64) -> Self {
        self.core.variable_cost = cost;
        self
    }

    pub fn with_interest_rate(mut self, rate: f64) -> Self {
        self.interest_rate = rate;
        self
    }

    pub fn with_calibration(mut self, production: f64, yield_: f64) -> Self {
        self.food.cal_production = Some(production);
        self.food.cal_yield = Some(yield_);
        self
    }

    pub fn with_future_production(mut self, production: f64) -> Self {
        self.future_production = Some(production);
        self
    }

    pub fn with_ag_prod_change(mut self, change: f64) -> Self {
        self.food.ag_prod_change = change;
        self
    }

    pub fn rotation_period(&self) -> u32 {
        self.rotation_period
    }

    pub fn interest_rate(&self) -> f64 {
        self.interest_rate
    }

    pub fn variable_cost(&self) -> f64 {
        self.core.variable_cost
    }

    pub fn future_supply(&self) -> f64 {
        self.future_supply
    }

    pub fn land_type(&self) -> &str {
        &self.food.land_type
    }

    pub fn calc_discount_factor(&self) -> f64 {
        discount_factor(self.interest_rate, self.rotation_period)
    }

    /// Present value of the profit per unit of future output.
    pub fn calc_profit_rate(&self, ctx: &CalcContext<'_>, period: Period) -> f64 {
        let future_market = future_market_name(ctx.sector);
        let profit = self
            .food
            .calc_profit_rate(&self.core, ctx, &future_market, period);
        profit * self.calc_discount_factor()
    }

    fn rotation_steps(&self, timestep: u32) -> usize {
        if timestep == 0 {
            return 0;
        }
        (self.rotation_period / timestep) as usize
    }

    /// Push the calibrated stand into the land allocator.
    ///
    /// Land and yield are written for the vintage's period and, when a
    /// future production is known, for each period of the following
    /// rotation, interpolating production linearly. Every call writes the
    /// same values.
    pub fn set_cal_land_values(&mut self, ctx: &mut CalcContext<'_>) {
        let (Some(cal_production), Some(cal_yield)) =
            (self.food.cal_production, self.food.cal_yield)
        else {
            return;
        };
        let period = self.core.period;
        let timestep = ctx.timestep(period);
        let steps = match self.future_production {
            Some(_) => self.rotation_steps(timestep),
            None => 0,
        };
        let future_production = self.future_production.unwrap_or(cal_production);
        let last = (period + steps).min(ctx.final_period());

        let mut production = cal_production;
        for i in period..=last {
            let mut yield_ = cal_yield;
            if i > period {
                production += (future_production - cal_production) / steps as f64;
                let years = f64::from(timestep) * (i - period) as f64;
                yield_ = cal_yield * (1.0 + self.food.ag_prod_change).powf(years);
            }
            let land = production / yield_;
            ctx.land_allocator.set_cal_land_allocation(
                &self.food.land_type,
                &self.core.name,
                land,
                i,
                period,
            );
            ctx.land_allocator
                .set_cal_observed_yield(&self.food.land_type, &self.core.name, yield_, i);
            if i == period {
                self.food.cal_observed_yield = Some(yield_);
            }
        }
    }

    /// Derive the variable cost from the observed price and pass it on to
    /// the next period.
    fn calibrate_variable_cost(
        &mut self,
        ctx: &mut CalcContext<'_>,
        period: Period,
        observed_yield: f64,
    ) {
        let product = ctx.sector;
        let Some(cal_price) = ctx.info_value(product, period, CAL_PRICE) else {
            warn!(
                technology = %self.core.name,
                region = ctx.region,
                period,
                "Calibrated vintage has no calibration price"
            );
            return;
        };
        let unmanaged_rate = ctx
            .land_allocator
            .cal_ave_observed_rate(&self.food.land_type, period);
        let profit_factor = unmanaged_rate / self.calc_discount_factor();
        let cal_var_cost = cal_price - profit_factor / observed_yield;
        let carried = if cal_var_cost > 0.0 {
            self.core.variable_cost = cal_var_cost;
            cal_var_cost
        } else {
            debug!(
                technology = %self.core.name,
                region = ctx.region,
                shortfall = -cal_var_cost,
                "Calibration price too low; keeping configured variable cost"
            );
            self.core.variable_cost
        };
        if let Some(info) = ctx.info_mut(product, period + 1) {
            info.set_double(CAL_VAR_COST, carried);
        }
    }
}

impl ProducibleTechnology for ForestProductionTechnology {
    fn core(&self) -> &TechnologyCore {
        &self.core
    }

    fn xml_name(&self) -> &'static str {
        Self::XML_NAME
    }

    fn complete_init(&mut self, ctx: &mut CalcContext<'_>) -> Result<()> {
        resolve_vintage(&mut self.core, ctx.modeltime)?;
        ctx.land_allocator.add_land_usage(
            &self.food.land_type,
            &self.core.name,
            LandUsageKind::Forest,
        )?;
        self.set_cal_land_values(ctx);
        Ok(())
    }

    fn init_calc(&mut self, ctx: &mut CalcContext<'_>, period: Period) {
        if self.core.period > 0 {
            self.food.apply_ag_prod_change(ctx, &self.core.name, period);
        }
        self.set_cal_land_values(ctx);

        let is_final = period >= ctx.final_period();
        let product = ctx.sector;
        match self.food.cal_observed_yield {
            Some(observed_yield) if !is_final => {
                self.calibrate_variable_cost(ctx, period, observed_yield);
                if let (Some(_), Some(future)) = (self.food.cal_production, self.future_production)
                {
                    if let Some(info) = ctx.info_mut(&future_market_name(product), period) {
                        let existing = info.get_double(CAL_SUPPLY).unwrap_or(0.0).max(0.0);
                        info.set_double(CAL_SUPPLY, existing + future);
                    }
                }
            }
            _ => {
                let inherited = ctx.info_value(product, period, CAL_VAR_COST);
                if let (Some(cost), false) = (inherited, is_final) {
                    if let Some(info) = ctx.info_mut(product, period + 1) {
                        info.set_double(CAL_VAR_COST, cost);
                    }
                }
                if let Some(cost) = inherited.filter(|cost| *cost > 0.0) {
                    self.core.variable_cost = cost;
                }
            }
        }
        trace!(
            technology = %self.core.name,
            period,
            variable_cost = self.core.variable_cost,
            "Forest init_calc"
        );
    }

    fn calc_share(&mut self, ctx: &mut CalcContext<'_>, period: Period) -> f64 {
        let profit = self.calc_profit_rate(ctx, period);
        self.food.set_intrinsic_rate(ctx, &self.core.name, profit, period);
        self.core.share = 1.0;
        self.core.share
    }

    fn production(&mut self, ctx: &mut CalcContext<'_>, _demand: f64, period: Period) {
        let product = ctx.sector;
        let profit = self.calc_profit_rate(ctx, period);
        let harvest = self.harvest_period(ctx.modeltime, period);

        self.future_supply = 0.0;
        if harvest <= ctx.final_period() {
            ctx.land_allocator.calc_yield(
                &self.food.land_type,
                &self.core.name,
                profit,
                harvest,
                period,
            );
            self.future_supply = self.food.calc_supply(ctx, &self.core.name, harvest);
            ctx.add_supply(&future_market_name(product), self.future_supply, period);
        }

        self.core.output = self.food.calc_supply(ctx, &self.core.name, period);
        ctx.add_supply(product, self.core.output, period);
        self.core.input = ctx
            .land_allocator
            .land_allocation(&self.food.land_type, &self.core.name, period);
        self.core.calc_emissions();
    }

    fn future_market(&self, product: &str) -> Option<String> {
        Some(future_market_name(product))
    }

    fn harvest_period(&self, modeltime: &Modeltime, period: Period) -> Period {
        period + self.rotation_steps(modeltime.timestep(period))
    }
}

impl ToDebugXml for ForestProductionTechnology {
    fn to_debug_xml(&self, _period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        let year = self.core.year.to_string();
        out.open(
            Self::XML_NAME,
            &[("name", self.core.name.as_str()), ("year", year.as_str())],
        )?;
        self.food.write_xml_fields(out)?;
        out.element("rotationPeriod", self.rotation_period)?;
        out.element("interestRate", self.interest_rate)?;
        if let Some(value) = self.future_production {
            out.element("futureProduction", value)?;
        }
        out.element("futureSupply", self.future_supply)?;
        self.core.write_xml_fields(out)?;
        out.close(Self::XML_NAME)
    }
}
