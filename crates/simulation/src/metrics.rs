//! SolverMetricsHook - built-in hook aggregating solver effort per run.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use solver::SolveOutcome;
use types::Period;

use crate::hooks::{PeriodContext, ScenarioHook};

/// Solver effort for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodMetrics {
    pub period: Period,
    pub evaluations: usize,
    pub iterations: usize,
    pub solved: bool,
    pub worst_relative_excess_demand: f64,
}

/// Aggregate solver metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverMetricsSnapshot {
    pub total_periods: u64,
    pub total_evaluations: u64,
    pub total_iterations: u64,
    pub failed_periods: u64,
    pub avg_evaluations_per_period: f64,
    pub peak_evaluations: u64,
}

/// Counts solver evaluations and failures across a run.
///
/// # Example
///
/// ```ignore
/// let metrics = Arc::new(SolverMetricsHook::new());
/// scenario.add_hook(metrics.clone());
/// scenario.run("")?;
/// println!("{} evaluations", metrics.snapshot().total_evaluations);
/// ```
pub struct SolverMetricsHook {
    periods: AtomicU64,
    evaluations: AtomicU64,
    iterations: AtomicU64,
    failures: AtomicU64,
    peak_evaluations: AtomicU64,
    history: Mutex<Vec<PeriodMetrics>>,
}

impl SolverMetricsHook {
    pub fn new() -> Self {
        Self {
            periods: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
            iterations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            peak_evaluations: AtomicU64::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> SolverMetricsSnapshot {
        let total_periods = self.periods.load(Ordering::Relaxed);
        let total_evaluations = self.evaluations.load(Ordering::Relaxed);
        let avg = if total_periods > 0 {
            total_evaluations as f64 / total_periods as f64
        } else {
            0.0
        };
        SolverMetricsSnapshot {
            total_periods,
            total_evaluations,
            total_iterations: self.iterations.load(Ordering::Relaxed),
            failed_periods: self.failures.load(Ordering::Relaxed),
            avg_evaluations_per_period: avg,
            peak_evaluations: self.peak_evaluations.load(Ordering::Relaxed),
        }
    }

    /// Per-period records in the order they were solved.
    pub fn history(&self) -> Vec<PeriodMetrics> {
        self.history.lock().clone()
    }

    /// Periods that did not converge, ascending.
    pub fn failed_periods(&self) -> Vec<Period> {
        let mut failed: Vec<Period> = self
            .history
            .lock()
            .iter()
            .filter(|m| !m.solved)
            .map(|m| m.period)
            .collect();
        failed.sort_unstable();
        failed
    }

    pub fn reset(&self) {
        self.periods.store(0, Ordering::Relaxed);
        self.evaluations.store(0, Ordering::Relaxed);
        self.iterations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.peak_evaluations.store(0, Ordering::Relaxed);
        self.history.lock().clear();
    }
}

impl Default for SolverMetricsHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioHook for SolverMetricsHook {
    fn name(&self) -> &str {
        "SolverMetrics"
    }

    fn on_solve(&self, outcome: SolveOutcome, _ctx: &PeriodContext) {
        let evaluations = outcome.evaluations as u64;
        self.periods.fetch_add(1, Ordering::Relaxed);
        self.evaluations.fetch_add(evaluations, Ordering::Relaxed);
        self.iterations
            .fetch_add(outcome.iterations as u64, Ordering::Relaxed);
        self.peak_evaluations.fetch_max(evaluations, Ordering::Relaxed);
        if !outcome.solved {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.history.lock().push(PeriodMetrics {
            period: outcome.period,
            evaluations: outcome.evaluations,
            iterations: outcome.iterations,
            solved: outcome.solved,
            worst_relative_excess_demand: outcome.worst_relative_excess_demand,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(period: Period, evaluations: usize, solved: bool) -> SolveOutcome {
        SolveOutcome {
            period,
            solved,
            evaluations,
            iterations: evaluations / 2,
            worst_relative_excess_demand: if solved { 0.0 } else { 0.5 },
            unsolved_markets: Vec::new(),
        }
    }

    #[test]
    fn test_metrics_aggregate() {
        let hook = SolverMetricsHook::new();
        let ctx = PeriodContext::new(0, 1975);
        hook.on_solve(outcome(0, 10, true), &ctx);
        hook.on_solve(outcome(1, 30, false), &ctx);
        hook.on_solve(outcome(2, 20, true), &ctx);

        let snapshot = hook.snapshot();
        assert_eq!(snapshot.total_periods, 3);
        assert_eq!(snapshot.total_evaluations, 60);
        assert_eq!(snapshot.failed_periods, 1);
        assert_eq!(snapshot.peak_evaluations, 30);
        assert!((snapshot.avg_evaluations_per_period - 20.0).abs() < 1e-12);
        assert_eq!(hook.failed_periods(), vec![1]);
        assert_eq!(hook.history().len(), 3);
    }

    #[test]
    fn test_metrics_reset() {
        let hook = SolverMetricsHook::new();
        hook.on_solve(outcome(0, 10, false), &PeriodContext::new(0, 1975));
        hook.reset();
        assert_eq!(hook.snapshot(), SolverMetricsSnapshot::default());
        assert!(hook.failed_periods().is_empty());
    }
}
