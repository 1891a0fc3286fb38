//! Solver crate: clears every solvable market of one period.
//!
//! The solver searches for trial prices at which demand equals supply in
//! every market simultaneously. Markets are not independently evaluable: one
//! [`Calculable::calc`] pass recomputes supplies and demands for all markets
//! at once, so the cost of a solve is counted in evaluations of that pass.
//!
//! # Algorithm
//!
//! ```text
//! evaluate(start prices)
//! ┌─ bracketing ─────────────────────────────────────────┐
//! │ ED > 0 → price × expansion    ED < 0 → price / expansion │
//! │ until each market has seen both signs                 │
//! └───────────────────────────────────────────────────────┘
//! ┌─ refinement ─────────────────────────────────────────┐
//! │ dED/dp per market by finite difference               │
//! │ Newton step, or bracket midpoint when the step       │
//! │ leaves the bracket or the derivative is ~0           │
//! └───────────────────────────────────────────────────────┘
//! leave the best trial in the marketplace
//! ```
//!
//! Non-convergence is an ordinary outcome: [`SolveOutcome::solved`] is
//! `false` and the caller decides what to do with it.

mod bisection_nr;
mod config;
mod solution;

pub use bisection_nr::BisectionNrSolver;
pub use config::SolverConfig;
pub use solution::{SolutionInfo, SolutionSet, SolveOutcome};

use marketplace::Marketplace;
use types::Period;

/// The world calculation the solver re-runs for every trial.
///
/// Implementations must recompute every supply and demand of `period` from
/// the current marketplace prices. The solver zeroes the period's
/// accumulators before each call.
pub trait Calculable {
    fn calc(&mut self, marketplace: &mut Marketplace, period: Period);
}

/// Adapter turning a closure into a [`Calculable`].
pub struct FnCalc<F>(F);

/// Wrap a closure as a [`Calculable`].
pub fn from_fn<F>(f: F) -> FnCalc<F>
where
    F: FnMut(&mut Marketplace, Period),
{
    FnCalc(f)
}

impl<F> Calculable for FnCalc<F>
where
    F: FnMut(&mut Marketplace, Period),
{
    fn calc(&mut self, marketplace: &mut Marketplace, period: Period) {
        (self.0)(marketplace, period)
    }
}

/// A market-clearing algorithm.
pub trait Solver {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Clear the markets of one period.
    ///
    /// On return the marketplace holds the best trial found, with supplies
    /// and demands evaluated at those prices, whether or not the period
    /// converged.
    fn solve(
        &mut self,
        marketplace: &mut Marketplace,
        world: &mut dyn Calculable,
        period: Period,
    ) -> SolveOutcome;
}
