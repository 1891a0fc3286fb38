//! Technologies crate: how sectors turn prices into supply.
//!
//! This crate provides:
//! - The [`ProducibleTechnology`] trait every variant implements
//! - [`CalcContext`], the explicit view of shared model state a technology
//!   receives on each call
//! - [`TechnologyCore`] and [`FoodProduction`], the helpers variants
//!   delegate to
//! - The [`LandAllocator`] interface with [`SimpleLandAllocator`]
//! - JSON construction through per-variant field tables
//!
//! # Variants
//! - [`GenericTechnology`] - cost-share supply from a fixed capacity
//! - [`FoodProductionTechnology`] - land-based, harvested when planted
//! - [`ForestProductionTechnology`] - land-based, harvested a rotation later
//!
//! # Per-period call order
//! ```text
//! complete_init            (once per run)
//! init_calc(p)             (once per period, operating vintages only)
//! ┌ calc_share(p)          ┐
//! └ production(p)          ┘ every solver trial
//! ```

mod base;
mod context;
mod error;
mod fields;
mod food;
mod forest;
mod generic;
mod land;
mod traits;

pub use context::CalcContext;
pub use base::{Ghg, TechnologyCore};
pub use error::{Result, TechnologyError};
pub use fields::{apply_fields, parse_technology, Field};
pub use food::{FoodProduction, FoodProductionTechnology};
pub use forest::{
    discount_factor, future_market_name, ForestProductionTechnology, CAL_PRICE, CAL_SUPPLY,
    CAL_VAR_COST, DEFAULT_INTEREST_RATE, FUTURE_MARKET_PREFIX,
};
pub use generic::GenericTechnology;
pub use land::{LandAllocator, LandType, LandUsageKind, SimpleLandAllocator};
pub use traits::ProducibleTechnology;
