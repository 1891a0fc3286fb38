//! Bracketing followed by Newton-Raphson refinement with bisection fallback.

use marketplace::Marketplace;
use tracing::{debug, info, warn};
use types::Period;

use crate::{Calculable, SolutionSet, SolveOutcome, Solver, SolverConfig};

/// Per-market bracketing + Newton-Raphson solver.
///
/// Each market's price moves along its own excess-demand curve with the
/// other markets held at their current trial prices. Cross-market effects
/// enter through re-evaluation: a bracket bound contradicted by a later
/// evaluation is dropped and searched for again.
#[derive(Debug, Clone, Default)]
pub struct BisectionNrSolver {
    config: SolverConfig,
}

/// Best trial seen so far.
struct BestTrial {
    score: f64,
    prices: Vec<f64>,
}

impl BestTrial {
    fn new(set: &SolutionSet, config: &SolverConfig) -> Self {
        Self {
            score: set.worst_relative_excess_demand(config),
            prices: set.prices(),
        }
    }

    /// Record the set's state if it beats the best; returns whether it did.
    fn offer(&mut self, set: &SolutionSet, config: &SolverConfig) -> bool {
        let score = set.worst_relative_excess_demand(config);
        if score < self.score {
            self.score = score;
            self.prices = set.prices();
            true
        } else {
            false
        }
    }
}

impl BisectionNrSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Next price for a bracketed market: the Newton step when it lands
    /// strictly inside the bracket, otherwise the midpoint.
    fn refine_price(&self, price: f64, ed: f64, derivative: f64, low: f64, high: f64) -> f64 {
        let midpoint = 0.5 * (low + high);
        if derivative.abs() <= self.config.derivative_floor {
            return midpoint;
        }
        let step = price - ed / derivative;
        if step.is_finite() && step > low && step < high {
            step
        } else {
            midpoint
        }
    }

    fn finish(&self, set: &SolutionSet, evaluations: usize, iterations: usize) -> SolveOutcome {
        let config = &self.config;
        let outcome = SolveOutcome {
            period: set.period(),
            solved: set.all_solved(config),
            evaluations,
            iterations,
            worst_relative_excess_demand: set.worst_relative_excess_demand(config),
            unsolved_markets: set.unsolved_markets(config),
        };
        if outcome.solved {
            info!(
                period = outcome.period,
                evaluations, iterations, "Period solved"
            );
        } else {
            let unsolved: Vec<String> = outcome
                .unsolved_markets
                .iter()
                .map(ToString::to_string)
                .collect();
            warn!(
                period = outcome.period,
                evaluations,
                worst = outcome.worst_relative_excess_demand,
                unsolved = ?unsolved,
                "Period did not converge"
            );
        }
        outcome
    }
}

impl Solver for BisectionNrSolver {
    fn name(&self) -> &str {
        "BisectionNR"
    }

    fn solve(
        &mut self,
        marketplace: &mut Marketplace,
        world: &mut dyn Calculable,
        period: Period,
    ) -> SolveOutcome {
        let config = self.config.clone();
        let mut set = SolutionSet::new(marketplace, period);
        if set.is_empty() {
            debug!(period, "No solvable markets");
            return SolveOutcome::trivial(period);
        }

        // One pass is always held back for the re-evaluation at the best trial.
        let budget = config.max_evaluations.max(1);
        let mut evaluations = 0;
        let mut iterations = 0;

        set.evaluate(marketplace, world);
        evaluations += 1;
        set.update_brackets(&config);
        let mut best = BestTrial::new(&set, &config);
        let mut current_is_best = true;

        // ─── Bracketing ──────────────────────────────────────────────────
        let mut bracket_iterations = 0;
        while !set.all_solved(&config)
            && !set.all_bracketed(&config)
            && bracket_iterations < config.max_bracket_iterations
            && evaluations + 2 <= budget
        {
            let before = set.prices();
            set.expand_unbracketed(&config);
            if set.prices() == before {
                break;
            }
            set.evaluate(marketplace, world);
            evaluations += 1;
            bracket_iterations += 1;
            iterations += 1;
            set.update_brackets(&config);
            current_is_best = best.offer(&set, &config);
        }
        debug!(
            period,
            bracket_iterations,
            evaluations,
            bracketed = set.all_bracketed(&config),
            "Bracketing finished"
        );

        // ─── Refinement ──────────────────────────────────────────────────
        while !set.all_solved(&config) {
            let unsolved = set.unsolved_indices(&config);
            let bracketed: Vec<usize> = unsolved
                .iter()
                .copied()
                .filter(|i| set.item(*i).is_bracketed())
                .collect();
            // Derivative probes, the step itself, and the final re-evaluation.
            if evaluations + bracketed.len() + 2 > budget {
                break;
            }

            let base_prices = set.prices();
            let base_results = set.results();

            let mut derivatives = Vec::with_capacity(bracketed.len());
            for &i in &bracketed {
                let price = base_prices[i];
                let h = config.derivative_step * price.abs().max(config.min_price);
                set.item_mut(i).price = price + h;
                set.evaluate(marketplace, world);
                evaluations += 1;
                current_is_best = false;
                derivatives.push((set.item(i).excess_demand - base_results[i].0) / h);
                set.set_prices(&base_prices);
            }
            set.restore_results(&base_results);

            for (&i, &derivative) in bracketed.iter().zip(&derivatives) {
                let item = set.item(i);
                if let Some((low, high)) = item.bracket() {
                    let next =
                        self.refine_price(item.price, item.excess_demand, derivative, low, high);
                    set.item_mut(i).price = config.clamp_price(next);
                }
            }
            for &i in &unsolved {
                if !set.item(i).is_bracketed() {
                    set.expand_item(i, &config);
                }
            }

            if set.prices() == base_prices {
                debug!(period, iterations, "No further price movement");
                break;
            }

            set.evaluate(marketplace, world);
            evaluations += 1;
            iterations += 1;
            set.update_brackets(&config);
            set.discard_collapsed_brackets(&config);
            current_is_best = best.offer(&set, &config);
            debug!(
                period,
                iteration = iterations,
                evaluations,
                worst = set.worst_relative_excess_demand(&config),
                "Refinement step"
            );
        }

        if !current_is_best {
            set.set_prices(&best.prices);
            set.evaluate(marketplace, world);
            evaluations += 1;
            set.update_brackets(&config);
        }

        self.finish(&set, evaluations, iterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_fn;

    fn single_market() -> Marketplace {
        let mut mp = Marketplace::new(1);
        mp.create_market("Forest", "USA", 1.0, true);
        mp
    }

    /// D = 100/p, S = 10p; clears at p = √10.
    fn sqrt_ten_world(mp: &mut Marketplace, period: Period) {
        let p = mp.price("Forest", "USA", period).unwrap();
        mp.add_to_supply("Forest", "USA", 10.0 * p, period).unwrap();
        mp.add_to_demand("Forest", "USA", 100.0 / p, period).unwrap();
    }

    #[test]
    fn test_single_market_converges() {
        let mut mp = single_market();
        let mut solver = BisectionNrSolver::default();
        let outcome = solver.solve(&mut mp, &mut from_fn(sqrt_ten_world), 0);

        assert!(outcome.solved());
        assert!(outcome.unsolved_markets.is_empty());
        let price = mp.price("Forest", "USA", 0).unwrap();
        assert!((price - 10f64.sqrt()).abs() < 1e-2, "price {price}");
    }

    #[test]
    fn test_best_trial_left_in_marketplace() {
        let mut mp = single_market();
        let mut solver = BisectionNrSolver::default();
        solver.solve(&mut mp, &mut from_fn(sqrt_ten_world), 0);

        let price = mp.price("Forest", "USA", 0).unwrap();
        let supply = mp.supply("Forest", "USA", 0).unwrap();
        let demand = mp.demand("Forest", "USA", 0).unwrap();
        assert!((supply - 10.0 * price).abs() < 1e-6);
        assert!((demand - 100.0 / price).abs() < 1e-6);
    }

    #[test]
    fn test_coupled_markets_converge() {
        let mut mp = Marketplace::new(1);
        mp.create_market("A", "R", 1.0, true);
        mp.create_market("B", "R", 1.0, true);
        let mut world = from_fn(|mp: &mut Marketplace, period: Period| {
            let pa = mp.price("A", "R", period).unwrap();
            let pb = mp.price("B", "R", period).unwrap();
            mp.add_to_supply("A", "R", 2.0 * pa, period).unwrap();
            mp.add_to_demand("A", "R", 10.0 + pb - pa, period).unwrap();
            mp.add_to_supply("B", "R", 2.0 * pb, period).unwrap();
            mp.add_to_demand("B", "R", 6.0 + 0.5 * pa - pb, period).unwrap();
        });

        let outcome = BisectionNrSolver::default().solve(&mut mp, &mut world, 0);
        assert!(outcome.solved());
        let pa = mp.price("A", "R", 0).unwrap();
        let pb = mp.price("B", "R", 0).unwrap();
        assert!((pb - 46.0 / 17.0).abs() < 1e-2, "pb {pb}");
        assert!((pa - (10.0 + 46.0 / 17.0) / 3.0).abs() < 1e-2, "pa {pa}");
    }

    #[test]
    fn test_unclearable_market_terminates_unsolved() {
        let mut mp = single_market();
        let mut world = from_fn(|mp: &mut Marketplace, period: Period| {
            mp.add_to_supply("Forest", "USA", 10.0, period).unwrap();
        });
        let config = SolverConfig::default().with_max_evaluations(50);
        let outcome = BisectionNrSolver::new(config).solve(&mut mp, &mut world, 0);

        assert!(!outcome.solved());
        assert!(outcome.evaluations <= 50);
        assert_eq!(outcome.unsolved_markets, vec![types::MarketKey::new("Forest", "USA")]);
    }

    #[test]
    fn test_discontinuous_excess_demand_respects_budget() {
        let mut mp = single_market();
        let mut world = from_fn(|mp: &mut Marketplace, period: Period| {
            let p = mp.price("Forest", "USA", period).unwrap();
            if p < 3.0 {
                mp.add_to_demand("Forest", "USA", 1.0, period).unwrap();
            } else {
                mp.add_to_supply("Forest", "USA", 1.0, period).unwrap();
            }
        });
        let config = SolverConfig::default().with_max_evaluations(200);
        let outcome = BisectionNrSolver::new(config).solve(&mut mp, &mut world, 0);

        assert!(!outcome.solved());
        assert!(outcome.evaluations <= 200);
    }

    #[test]
    fn test_deterministic_trials() {
        let run = || {
            let mut mp = single_market();
            let outcome =
                BisectionNrSolver::default().solve(&mut mp, &mut from_fn(sqrt_ten_world), 0);
            (outcome, mp.price("Forest", "USA", 0).unwrap())
        };
        let (a, pa) = run();
        let (b, pb) = run();
        assert_eq!(a, b);
        assert_eq!(pa.to_bits(), pb.to_bits());
    }

    #[test]
    fn test_no_solvable_markets_is_trivially_solved() {
        let mut mp = Marketplace::new(1);
        mp.create_market("Land", "USA", 1.0, false);
        let mut calls = 0;
        let mut world = from_fn(|_: &mut Marketplace, _: Period| calls += 1);
        let outcome = BisectionNrSolver::default().solve(&mut mp, &mut world, 0);
        drop(world);

        assert!(outcome.solved());
        assert_eq!(outcome.evaluations, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_single_evaluation_budget() {
        let mut mp = single_market();
        let config = SolverConfig::default().with_max_evaluations(1);
        let outcome =
            BisectionNrSolver::new(config).solve(&mut mp, &mut from_fn(sqrt_ten_world), 0);
        assert_eq!(outcome.evaluations, 1);
        assert!(!outcome.solved());
    }

    #[test]
    fn test_refine_price_falls_back_to_midpoint() {
        let solver = BisectionNrSolver::default();
        // Flat derivative.
        assert_eq!(solver.refine_price(2.0, 1.0, 0.0, 1.0, 3.0), 2.0);
        // Step leaves the bracket.
        assert_eq!(solver.refine_price(2.0, 10.0, -1.0, 1.0, 3.0), 2.0);
        // Step inside the bracket.
        assert_eq!(solver.refine_price(2.0, 0.5, -1.0, 1.0, 3.0), 2.5);
    }
}
