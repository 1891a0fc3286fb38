//! Scenario hooks for observing the run loop.
//!
//! Hooks are **observers**: they receive owned snapshots at fixed points of
//! the run and cannot modify model state. Hook-owned state uses interior
//! mutability (atomics, `parking_lot::Mutex`).
//!
//! # Lifecycle
//!
//! ```text
//! on_run_start
//! for each period:
//!     on_period_start   ← after carry-forward, before any calculation
//!     on_solve          ← with the solver's outcome
//!     on_period_end     ← after summaries, with solved prices
//! on_run_end            ← with the run summary
//! ```

use std::sync::Arc;

use marketplace::Marketplace;
use solver::SolveOutcome;
use types::{MarketKey, Period, Year};

use crate::RunSummary;

// ─────────────────────────────────────────────────────────────────────────────
// Hook Context
// ─────────────────────────────────────────────────────────────────────────────

/// State of one market cell at the time of the hook call.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub key: MarketKey,
    pub price: f64,
    pub supply: f64,
    pub demand: f64,
    pub solvable: bool,
}

/// Owned view of a period passed to hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodContext {
    pub period: Period,
    pub year: Year,
    /// Every market of the period in registration order.
    pub markets: Vec<MarketSnapshot>,
}

impl PeriodContext {
    pub fn new(period: Period, year: Year) -> Self {
        Self {
            period,
            year,
            markets: Vec::new(),
        }
    }

    /// Snapshot every market of `period`.
    pub fn from_marketplace(marketplace: &Marketplace, period: Period, year: Year) -> Self {
        let markets = marketplace
            .market_ids()
            .filter_map(|id| marketplace.cell(id, period))
            .map(|market| MarketSnapshot {
                key: market.key().clone(),
                price: market.price(),
                supply: market.supply(),
                demand: market.demand(),
                solvable: market.is_solvable(),
            })
            .collect();
        Self {
            period,
            year,
            markets,
        }
    }

    pub fn market(&self, good: &str, region: &str) -> Option<&MarketSnapshot> {
        self.markets
            .iter()
            .find(|m| m.key.good == good && m.key.region == region)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ScenarioHook Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for run-loop observers.
///
/// Hooks must be `Send + Sync` so one instance can be shared through an
/// `Arc` with whoever reads its results.
pub trait ScenarioHook: Send + Sync {
    /// Human-readable name for logging and debugging.
    fn name(&self) -> &str;

    /// Called once before the first period.
    #[allow(unused_variables)]
    fn on_run_start(&self, scenario: &str, periods: usize) {}

    /// Called at the start of each period.
    #[allow(unused_variables)]
    fn on_period_start(&self, ctx: &PeriodContext) {}

    /// Called after the solver returns, whether or not it converged.
    #[allow(unused_variables)]
    fn on_solve(&self, outcome: SolveOutcome, ctx: &PeriodContext) {}

    /// Called when the period's summaries are complete.
    #[allow(unused_variables)]
    fn on_period_end(&self, ctx: &PeriodContext) {}

    /// Called once after the climate step.
    #[allow(unused_variables)]
    fn on_run_end(&self, summary: &RunSummary) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// HookRunner
// ─────────────────────────────────────────────────────────────────────────────

/// Registered hooks, invoked sequentially in registration order.
#[derive(Default)]
pub struct HookRunner {
    hooks: Vec<Arc<dyn ScenarioHook>>,
}

impl HookRunner {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add(&mut self, hook: Arc<dyn ScenarioHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn on_run_start(&self, scenario: &str, periods: usize) {
        for hook in &self.hooks {
            hook.on_run_start(scenario, periods);
        }
    }

    pub fn on_period_start(&self, ctx: &PeriodContext) {
        for hook in &self.hooks {
            hook.on_period_start(ctx);
        }
    }

    /// Clones the outcome for each hook to keep the owned-data contract.
    pub fn on_solve(&self, outcome: &SolveOutcome, ctx: &PeriodContext) {
        for hook in &self.hooks {
            hook.on_solve(outcome.clone(), ctx);
        }
    }

    pub fn on_period_end(&self, ctx: &PeriodContext) {
        for hook in &self.hooks {
            hook.on_period_end(ctx);
        }
    }

    pub fn on_run_end(&self, summary: &RunSummary) {
        for hook in &self.hooks {
            hook.on_run_end(summary);
        }
    }
}

impl std::fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRunner")
            .field("hooks", &self.hook_names())
            .finish()
    }
}
