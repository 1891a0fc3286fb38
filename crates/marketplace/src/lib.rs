//! Marketplace: the market cells cleared by the solver.
//!
//! This crate provides:
//! - [`Market`] - one good × region × period cell with price, supply, demand
//! - [`MarketInfo`] - key-value attachment used to pass calibration signals
//!   between periods
//! - [`Marketplace`] - owner of every market, with per-period reset,
//!   carry-forward and accumulation
//! - Error handling for marketplace operations
//!
//! # Period Protocol
//!
//! ```text
//! init_prices()                      once, before the first period
//! ┌──────────────────────────────────────────────────────┐
//! │ reset_period(p)     supply = demand = 0              │
//! │ carry_forward(p)    stored = (p-1), price = price(p-1)│
//! │ add_to_supply / add_to_demand   (technologies)       │
//! │ set_price           (solver trials)                  │
//! └──────────────────────────────────────────────────────┘
//! ```

mod error;
mod market;
mod market_info;
mod marketplace;

pub use error::{MarketplaceError, Result};
pub use market::Market;
pub use market_info::MarketInfo;
pub use marketplace::{MarketId, Marketplace};
