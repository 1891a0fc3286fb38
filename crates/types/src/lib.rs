//! Core types for the equilibrium model.
//!
//! This crate provides the data types shared by every other crate in the
//! workspace:
//! - [`MarketKey`], [`Period`], [`Year`] identifiers
//! - [`Modeltime`] mapping between model periods and calendar years
//! - [`Configuration`] key-value run settings
//! - [`Quantity`] fixed-point accumulator for supply and demand
//! - [`XmlWriter`] / [`ToDebugXml`] for the per-period debug document

mod config;
mod ids;
mod modeltime;
mod quantity;
pub mod xml;

pub use config::{ConfigError, ConfigValue, Configuration};
pub use ids::{MarketKey, Period, Year};
pub use modeltime::{Modeltime, ModeltimeError};
pub use quantity::{QUANTITY_MAX, QUANTITY_RESOLUTION, QUANTITY_SCALE, Quantity, QuantityError};
pub use xml::{ToDebugXml, XmlWriter};
