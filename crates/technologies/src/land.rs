//! Land allocation shared by the land-based technologies of a region.
//!
//! Technologies never own land. They push calibration records and intrinsic
//! profit rates into the region's [`LandAllocator`] and read back the area
//! and yield it assigns to their product.
//!
//! # Records per (land type, product)
//!
//! ```text
//! calibrated land  [harvest period] ──┐
//! planted land     [harvest period] ──┴─► land_allocation(p): planted, else calibrated, else 0
//! calibrated yield [period] ──┐
//! productivity     [period] ──┴─► yield_for(p)
//! ```
//!
//! Productivity is a schedule of compounding steps. Each step records the
//! level reached in its period together with the yearly rate and timestep
//! that produced it, and periods after the latest step are projected at
//! that rate. A harvest a rotation ahead therefore sees the same yield when
//! planted as when it is finally reaped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::Period;

use crate::{Result, TechnologyError};

/// How a product uses its land type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandUsageKind {
    /// Planted and harvested in the same period.
    Crop,
    /// Harvested a rotation after planting.
    Forest,
}

/// The land interface used by food and forest technologies.
pub trait LandAllocator: fmt::Debug + Send + Sync {
    /// Register a product on a land type.
    fn add_land_usage(
        &mut self,
        land_type: &str,
        product: &str,
        kind: LandUsageKind,
    ) -> Result<()>;

    /// Record calibrated land harvested in `harvest_period`, planted in
    /// `planting_period`.
    fn set_cal_land_allocation(
        &mut self,
        land_type: &str,
        product: &str,
        land: f64,
        harvest_period: Period,
        planting_period: Period,
    );

    fn set_cal_observed_yield(
        &mut self,
        land_type: &str,
        product: &str,
        value: f64,
        period: Period,
    );

    fn cal_land_allocation(&self, land_type: &str, product: &str, period: Period) -> Option<f64>;

    fn cal_observed_yield(&self, land_type: &str, product: &str, period: Period) -> Option<f64>;

    /// Observed profit rate of unmanaged land of this type.
    fn cal_ave_observed_rate(&self, land_type: &str, period: Period) -> f64;

    fn set_intrinsic_rate(
        &mut self,
        region: &str,
        land_type: &str,
        product: &str,
        rate: f64,
        period: Period,
    );

    /// Decide the land and yield for a harvest in `harvest_period` given the
    /// profit rate seen when planting in `period`.
    fn calc_yield(
        &mut self,
        land_type: &str,
        product: &str,
        profit_rate: f64,
        harvest_period: Period,
        period: Period,
    );

    /// Yield per unit land in a period.
    fn yield_for(&self, land_type: &str, product: &str, period: Period) -> f64;

    /// Land harvested for the product in a period.
    fn land_allocation(&self, land_type: &str, product: &str, period: Period) -> f64;

    /// Compound a yearly productivity change into `period`.
    fn apply_ag_prod_change(
        &mut self,
        land_type: &str,
        product: &str,
        change: f64,
        period: Period,
        timestep: u32,
    );
}

/// A land type: total area and the return of leaving it unmanaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandType {
    pub total_area: f64,
    /// Profit rate per unit area of unmanaged land.
    pub unmanaged_rate: f64,
    /// Elasticity of planted area to the managed/unmanaged rate ratio.
    #[serde(default = "default_elasticity")]
    pub elasticity: f64,
}

fn default_elasticity() -> f64 {
    1.0
}

impl LandType {
    pub fn new(total_area: f64, unmanaged_rate: f64) -> Self {
        Self {
            total_area,
            unmanaged_rate,
            elasticity: default_elasticity(),
        }
    }

    pub fn with_elasticity(mut self, elasticity: f64) -> Self {
        self.elasticity = elasticity;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ProductivityStep {
    level: f64,
    change: f64,
    timestep: u32,
}

impl ProductivityStep {
    fn project(&self, periods_ahead: usize) -> f64 {
        let years = f64::from(self.timestep) * periods_ahead as f64;
        self.level * (1.0 + self.change).powf(years)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LandUsage {
    kind: Option<LandUsageKind>,
    cal_land: BTreeMap<Period, f64>,
    cal_yield: BTreeMap<Period, f64>,
    intrinsic_rate: BTreeMap<Period, f64>,
    planted: BTreeMap<Period, f64>,
    productivity: BTreeMap<Period, ProductivityStep>,
}

impl LandUsage {
    fn productivity_at(&self, period: Period) -> f64 {
        self.productivity
            .range(..=period)
            .next_back()
            .map(|(step_period, step)| step.project(period - step_period))
            .unwrap_or(1.0)
    }

    fn yield_at(&self, period: Period) -> f64 {
        if let Some(value) = self.cal_yield.get(&period) {
            return *value;
        }
        match self.cal_yield.range(..period).next_back() {
            Some((base_period, base)) => {
                base * self.productivity_at(period) / self.productivity_at(*base_period)
            }
            None => 0.0,
        }
    }
}

/// Constant-elasticity land allocator.
///
/// Area planted for a harvest follows
/// `reference × (profit × yield / unmanaged_rate)^elasticity`, capped by the
/// land type's total area. The reference is the latest calibrated area of
/// the product, or half the land type when the product was never calibrated.
/// A calibrated harvest period keeps its calibrated area.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleLandAllocator {
    land_types: BTreeMap<String, LandType>,
    usages: BTreeMap<(String, String), LandUsage>,
}

impl SimpleLandAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_land_type(mut self, name: impl Into<String>, land_type: LandType) -> Self {
        self.land_types.insert(name.into(), land_type);
        self
    }

    pub fn land_type(&self, name: &str) -> Option<&LandType> {
        self.land_types.get(name)
    }

    pub fn land_types(&self) -> impl Iterator<Item = (&str, &LandType)> {
        self.land_types.iter().map(|(name, lt)| (name.as_str(), lt))
    }

    /// Registered usage kind of a product.
    pub fn usage_kind(&self, land_type: &str, product: &str) -> Option<LandUsageKind> {
        self.usage(land_type, product).and_then(|u| u.kind)
    }

    pub fn intrinsic_rate(&self, land_type: &str, product: &str, period: Period) -> Option<f64> {
        self.usage(land_type, product)
            .and_then(|u| u.intrinsic_rate.get(&period).copied())
    }

    fn usage(&self, land_type: &str, product: &str) -> Option<&LandUsage> {
        self.usages.get(&(land_type.to_string(), product.to_string()))
    }

    fn usage_mut(&mut self, land_type: &str, product: &str) -> &mut LandUsage {
        self.usages
            .entry((land_type.to_string(), product.to_string()))
            .or_default()
    }

    fn planted_area(
        land_type: &LandType,
        usage: &LandUsage,
        land_rate: f64,
        harvest: Period,
    ) -> f64 {
        let reference = usage
            .cal_land
            .range(..=harvest)
            .next_back()
            .map(|(_, v)| *v)
            .unwrap_or(0.5 * land_type.total_area);
        let area = if land_type.unmanaged_rate > 0.0 {
            reference * (land_rate / land_type.unmanaged_rate).powf(land_type.elasticity)
        } else if land_rate > 0.0 {
            land_type.total_area
        } else {
            0.0
        };
        if area.is_finite() {
            area.clamp(0.0, land_type.total_area)
        } else {
            land_type.total_area
        }
    }
}

impl LandAllocator for SimpleLandAllocator {
    fn add_land_usage(
        &mut self,
        land_type: &str,
        product: &str,
        kind: LandUsageKind,
    ) -> Result<()> {
        if !self.land_types.contains_key(land_type) {
            return Err(TechnologyError::UnknownLandType(land_type.to_string()));
        }
        debug!(land_type, product, ?kind, "Added land usage");
        self.usage_mut(land_type, product).kind = Some(kind);
        Ok(())
    }

    fn set_cal_land_allocation(
        &mut self,
        land_type: &str,
        product: &str,
        land: f64,
        harvest_period: Period,
        _planting_period: Period,
    ) {
        self.usage_mut(land_type, product)
            .cal_land
            .insert(harvest_period, land);
    }

    fn set_cal_observed_yield(
        &mut self,
        land_type: &str,
        product: &str,
        value: f64,
        period: Period,
    ) {
        self.usage_mut(land_type, product)
            .cal_yield
            .insert(period, value);
    }

    fn cal_land_allocation(&self, land_type: &str, product: &str, period: Period) -> Option<f64> {
        self.usage(land_type, product)
            .and_then(|u| u.cal_land.get(&period).copied())
    }

    fn cal_observed_yield(&self, land_type: &str, product: &str, period: Period) -> Option<f64> {
        self.usage(land_type, product)
            .and_then(|u| u.cal_yield.get(&period).copied())
    }

    fn cal_ave_observed_rate(&self, land_type: &str, _period: Period) -> f64 {
        self.land_types
            .get(land_type)
            .map(|lt| lt.unmanaged_rate)
            .unwrap_or(0.0)
    }

    fn set_intrinsic_rate(
        &mut self,
        _region: &str,
        land_type: &str,
        product: &str,
        rate: f64,
        period: Period,
    ) {
        self.usage_mut(land_type, product)
            .intrinsic_rate
            .insert(period, rate);
    }

    fn calc_yield(
        &mut self,
        land_type: &str,
        product: &str,
        profit_rate: f64,
        harvest_period: Period,
        _period: Period,
    ) {
        let Some(lt) = self.land_types.get(land_type) else {
            warn!(land_type, product, "calc_yield on unknown land type");
            return;
        };
        let usage = self
            .usages
            .entry((land_type.to_string(), product.to_string()))
            .or_default();
        let area = match usage.cal_land.get(&harvest_period) {
            Some(calibrated) => *calibrated,
            None => {
                let land_rate = profit_rate.max(0.0) * usage.yield_at(harvest_period);
                Self::planted_area(lt, usage, land_rate, harvest_period)
            }
        };
        usage.planted.insert(harvest_period, area);
    }

    fn yield_for(&self, land_type: &str, product: &str, period: Period) -> f64 {
        self.usage(land_type, product)
            .map(|u| u.yield_at(period))
            .unwrap_or(0.0)
    }

    fn land_allocation(&self, land_type: &str, product: &str, period: Period) -> f64 {
        self.usage(land_type, product)
            .and_then(|u| {
                u.planted
                    .get(&period)
                    .or_else(|| u.cal_land.get(&period))
                    .copied()
            })
            .unwrap_or(0.0)
    }

    fn apply_ag_prod_change(
        &mut self,
        land_type: &str,
        product: &str,
        change: f64,
        period: Period,
        timestep: u32,
    ) {
        let usage = self.usage_mut(land_type, product);
        let previous = match period.checked_sub(1) {
            Some(prev) => usage.productivity_at(prev),
            None => 1.0,
        };
        let step = ProductivityStep {
            level: previous,
            change,
            timestep,
        };
        usage.productivity.insert(period, ProductivityStep { level: step.project(1), ..step });
    }
}
