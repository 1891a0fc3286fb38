//! Simulation crate: the world model and the scenario run loop.
//!
//! This crate provides:
//! - `World` → `Region` → `Sector` → technologies, driven per period
//! - `Scenario`, which owns the marketplace, solver and world
//! - Hook-based observation of the run
//! - Debug XML, dependency graphs and the emissions artifact
//! - The hand-off to a climate model
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              Scenario::run()                 │
//! │                                              │
//! │  for each period:                            │
//! │    1. reset + carry forward marketplace      │
//! │    2. Hook: on_period_start                  │
//! │    3. World::init_calc, World::calc          │
//! │    4. Solver::solve (re-runs World::calc)    │
//! │    5. Hook: on_solve                         │
//! │    6. World::update_summary, emiss_ind       │
//! │    7. Hook: on_period_end                    │
//! │  emissions CSV → ClimateModel::run           │
//! │  Hook: on_run_end                            │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Hooks
//!
//! ```ignore
//! use simulation::{Scenario, SolverMetricsHook};
//! use std::sync::Arc;
//!
//! let mut scenario = Scenario::new("reference", config);
//! let metrics = Arc::new(SolverMetricsHook::new());
//! scenario.add_hook(metrics.clone());
//!
//! scenario.run("")?;
//! println!("Evaluations/period: {:.1}", metrics.snapshot().avg_evaluations_per_period);
//! ```

mod climate;
mod debug_xml;
mod emissions;
mod error;
mod graph;
pub mod hooks;
mod input;
mod metrics;
mod region;
mod scenario;
mod sector;
mod world;

pub use climate::{
    ClimateModel, CumulativeEmissionsClimate, NoClimateModel, TemperatureTarget, TrialStatus,
};
pub use debug_xml::{with_file_name_ending, DebugDocument};
pub use emissions::EmissionsSeries;
pub use error::{ClimateError, InputError, Result, ScenarioError};
pub use graph::{write_dependency_graph, write_sector_dependencies};
pub use hooks::{HookRunner, MarketSnapshot, PeriodContext, ScenarioHook};
pub use input::{RegionInput, ScenarioInput, SectorInput};
pub use metrics::{PeriodMetrics, SolverMetricsHook, SolverMetricsSnapshot};
pub use region::{MarketSpec, Region};
pub use scenario::{RunState, RunSummary, Scenario};
pub use sector::{DemandCurve, Sector, SectorSummary};
pub use world::{SectorDependency, World, WorldCalc};
