//! Working state of a single period's solve.

use marketplace::{MarketId, Marketplace};
use types::{MarketKey, Period};

use crate::{Calculable, SolverConfig};

/// Solver view of one solvable market.
#[derive(Debug, Clone)]
pub struct SolutionInfo {
    pub(crate) id: MarketId,
    pub(crate) key: MarketKey,
    /// Trial price.
    pub(crate) price: f64,
    /// Demand − supply at `price` after the last evaluation.
    pub(crate) excess_demand: f64,
    pub(crate) supply: f64,
    pub(crate) demand: f64,
    /// Highest price seen with positive excess demand.
    pub(crate) low: Option<f64>,
    /// Lowest price seen with negative excess demand.
    pub(crate) high: Option<f64>,
}

impl SolutionInfo {
    pub fn key(&self) -> &MarketKey {
        &self.key
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn excess_demand(&self) -> f64 {
        self.excess_demand
    }

    pub fn supply(&self) -> f64 {
        self.supply
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    /// The bracket `(low, high)` once both bounds are known.
    pub fn bracket(&self) -> Option<(f64, f64)> {
        self.low.zip(self.high)
    }

    pub fn is_bracketed(&self) -> bool {
        self.bracket().is_some()
    }

    pub fn is_solved(&self, config: &SolverConfig) -> bool {
        config.within_tolerance(self.excess_demand, self.supply, self.demand)
    }

    /// |ED| relative to the market size; zero when within tolerance.
    pub fn relative_excess_demand(&self, config: &SolverConfig) -> f64 {
        if self.is_solved(config) {
            return 0.0;
        }
        let scale = self.supply.max(self.demand).max(config.absolute_tolerance);
        self.excess_demand.abs() / scale
    }

    /// Tighten the bracket with the sign of the latest evaluation.
    ///
    /// A bound contradicted by the new point (possible when other markets'
    /// prices moved) is dropped and found again.
    fn update_bracket(&mut self, config: &SolverConfig) {
        if self.is_solved(config) {
            return;
        }
        if self.excess_demand > 0.0 {
            self.low = Some(self.price);
            if self.high.is_some_and(|high| high <= self.price) {
                self.high = None;
            }
        } else {
            self.high = Some(self.price);
            if self.low.is_some_and(|low| low >= self.price) {
                self.low = None;
            }
        }
    }

    /// Drop a bracket that has shrunk to nothing without solving the market.
    fn discard_collapsed_bracket(&mut self) {
        if let Some((low, high)) = self.bracket() {
            if high - low <= 1e-12 * high.abs().max(1.0) {
                self.low = None;
                self.high = None;
            }
        }
    }

    /// Move the price outward in the direction the excess demand points.
    fn expand(&mut self, config: &SolverConfig) {
        let next = if self.excess_demand > 0.0 {
            self.price.max(config.min_price) * config.bracket_expansion
        } else {
            self.price / config.bracket_expansion
        };
        self.price = config.clamp_price(next);
    }
}

/// Outcome of one period's solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub period: Period,
    /// Every solvable market is within tolerance.
    pub solved: bool,
    /// Calculation passes used, including the final one.
    pub evaluations: usize,
    /// Bracketing plus refinement iterations.
    pub iterations: usize,
    /// Largest relative excess demand left in the marketplace.
    pub worst_relative_excess_demand: f64,
    /// Markets outside tolerance, in registration order.
    pub unsolved_markets: Vec<MarketKey>,
}

impl SolveOutcome {
    /// Outcome for a period with nothing to solve.
    pub fn trivial(period: Period) -> Self {
        Self {
            period,
            solved: true,
            evaluations: 0,
            iterations: 0,
            worst_relative_excess_demand: 0.0,
            unsolved_markets: Vec::new(),
        }
    }

    pub fn solved(&self) -> bool {
        self.solved
    }
}

/// The solvable markets of one period, in registration order.
#[derive(Debug, Clone)]
pub struct SolutionSet {
    period: Period,
    items: Vec<SolutionInfo>,
}

impl SolutionSet {
    /// Collect the solvable markets of a period with their current prices.
    pub fn new(marketplace: &Marketplace, period: Period) -> Self {
        let items = marketplace
            .solvable_markets(period)
            .into_iter()
            .filter_map(|id| marketplace.cell(id, period).map(|market| (id, market)))
            .map(|(id, market)| SolutionInfo {
                id,
                key: market.key().clone(),
                price: market.price(),
                excess_demand: market.excess_demand(),
                supply: market.supply(),
                demand: market.demand(),
                low: None,
                high: None,
            })
            .collect();
        Self { period, items }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SolutionInfo] {
        &self.items
    }

    pub fn prices(&self) -> Vec<f64> {
        self.items.iter().map(SolutionInfo::price).collect()
    }

    pub fn set_prices(&mut self, prices: &[f64]) {
        for (item, price) in self.items.iter_mut().zip(prices) {
            item.price = *price;
        }
    }

    /// Write the trial prices, recompute the world and read the results back.
    pub fn evaluate(&mut self, marketplace: &mut Marketplace, world: &mut dyn Calculable) {
        for item in &self.items {
            marketplace.set_price_of(item.id, self.period, item.price);
        }
        marketplace.reset_period(self.period);
        world.calc(marketplace, self.period);
        for item in &mut self.items {
            if let Some(market) = marketplace.cell(item.id, self.period) {
                item.supply = market.supply();
                item.demand = market.demand();
                item.excess_demand = market.excess_demand();
            }
        }
    }

    pub fn all_solved(&self, config: &SolverConfig) -> bool {
        self.items.iter().all(|item| item.is_solved(config))
    }

    /// Every unsolved market has a two-sided bracket.
    pub fn all_bracketed(&self, config: &SolverConfig) -> bool {
        self.items
            .iter()
            .all(|item| item.is_solved(config) || item.is_bracketed())
    }

    /// Largest relative excess demand over all markets.
    pub fn worst_relative_excess_demand(&self, config: &SolverConfig) -> f64 {
        self.items
            .iter()
            .map(|item| item.relative_excess_demand(config))
            .fold(0.0, f64::max)
    }

    pub fn unsolved_markets(&self, config: &SolverConfig) -> Vec<MarketKey> {
        self.items
            .iter()
            .filter(|item| !item.is_solved(config))
            .map(|item| item.key.clone())
            .collect()
    }

    /// Indices of markets outside tolerance.
    pub fn unsolved_indices(&self, config: &SolverConfig) -> Vec<usize> {
        (0..self.items.len())
            .filter(|i| !self.items[*i].is_solved(config))
            .collect()
    }

    pub fn update_brackets(&mut self, config: &SolverConfig) {
        for item in &mut self.items {
            item.update_bracket(config);
        }
    }

    /// One bracketing move for every unsolved, unbracketed market.
    pub fn expand_unbracketed(&mut self, config: &SolverConfig) {
        for item in &mut self.items {
            if !item.is_solved(config) && !item.is_bracketed() {
                item.expand(config);
            }
        }
    }

    pub(crate) fn item(&self, index: usize) -> &SolutionInfo {
        &self.items[index]
    }

    pub(crate) fn item_mut(&mut self, index: usize) -> &mut SolutionInfo {
        &mut self.items[index]
    }

    pub(crate) fn discard_collapsed_brackets(&mut self, config: &SolverConfig) {
        for item in &mut self.items {
            if !item.is_solved(config) {
                item.discard_collapsed_bracket();
            }
        }
    }

    pub(crate) fn expand_item(&mut self, index: usize, config: &SolverConfig) {
        self.items[index].expand(config);
    }

    /// Results of the last evaluation, to restore after derivative probes.
    pub(crate) fn results(&self) -> Vec<(f64, f64, f64)> {
        self.items
            .iter()
            .map(|item| (item.excess_demand, item.supply, item.demand))
            .collect()
    }

    pub(crate) fn restore_results(&mut self, results: &[(f64, f64, f64)]) {
        for (item, (ed, supply, demand)) in self.items.iter_mut().zip(results) {
            item.excess_demand = *ed;
            item.supply = *supply;
            item.demand = *demand;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(price: f64, supply: f64, demand: f64) -> SolutionInfo {
        SolutionInfo {
            id: MarketId(0),
            key: MarketKey::new("Forest", "USA"),
            price,
            excess_demand: demand - supply,
            supply,
            demand,
            low: None,
            high: None,
        }
    }

    #[test]
    fn test_bracket_tightens_by_sign() {
        let config = SolverConfig::default();
        let mut item = info(2.0, 1.0, 5.0);
        item.update_bracket(&config);
        assert_eq!(item.low, Some(2.0));
        assert!(!item.is_bracketed());

        item.price = 4.0;
        item.supply = 6.0;
        item.demand = 2.0;
        item.excess_demand = -4.0;
        item.update_bracket(&config);
        assert_eq!(item.bracket(), Some((2.0, 4.0)));
    }

    #[test]
    fn test_contradicted_bound_dropped() {
        let config = SolverConfig::default();
        let mut item = info(4.0, 6.0, 2.0);
        item.low = Some(5.0);
        item.update_bracket(&config);
        assert_eq!(item.high, Some(4.0));
        assert_eq!(item.low, None);
    }

    #[test]
    fn test_expand_direction() {
        let config = SolverConfig::default();
        let mut up = info(1.0, 0.0, 1.0);
        up.expand(&config);
        assert_eq!(up.price, 2.0);

        let mut down = info(1.0, 1.0, 0.0);
        down.expand(&config);
        assert_eq!(down.price, 0.5);
    }

    #[test]
    fn test_relative_excess_demand() {
        let config = SolverConfig::default();
        assert_eq!(info(1.0, 10.0, 10.0).relative_excess_demand(&config), 0.0);
        assert!((info(1.0, 10.0, 12.0).relative_excess_demand(&config) - 2.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_collapsed_bracket_discarded() {
        let mut item = info(3.0, 0.0, 1.0);
        item.low = Some(3.0);
        item.high = Some(3.0);
        item.discard_collapsed_bracket();
        assert!(!item.is_bracketed());
    }
}
