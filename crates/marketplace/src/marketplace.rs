//! The marketplace: every market cell of the run.

use std::collections::{BTreeMap, HashMap};
use std::io;

use derive_more::{From, Into};
use tracing::{debug, warn};
use types::{MarketKey, Period, ToDebugXml, XmlWriter};

use crate::{Market, MarketInfo, MarketplaceError, Result};

/// Index of a market in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct MarketId(pub usize);

/// Owner of every market cell.
///
/// Markets are stored in registration order with one cell per period, so
/// iteration (and therefore the solver's trial sequence) is deterministic.
/// Info attachments are keyed independently of markets: a technology may
/// attach calibration values to a good that is never solved.
#[derive(Debug, Clone)]
pub struct Marketplace {
    /// `markets[id][period]`.
    markets: Vec<Vec<Market>>,
    index: HashMap<MarketKey, MarketId>,
    info: BTreeMap<(MarketKey, Period), MarketInfo>,
    max_period: usize,
    prices_initialized: bool,
}

impl Marketplace {
    /// Create an empty marketplace for a run of `max_period` periods.
    pub fn new(max_period: usize) -> Self {
        Self {
            markets: Vec::new(),
            index: HashMap::new(),
            info: BTreeMap::new(),
            max_period,
            prices_initialized: false,
        }
    }

    /// Number of periods each market spans.
    pub fn max_period(&self) -> usize {
        self.max_period
    }

    /// Number of registered markets.
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    /// Check if no markets are registered.
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    // =========================================================================
    // Registration and lookup
    // =========================================================================

    /// Register a market for every period of the run.
    ///
    /// Registering an existing key returns the existing id; the first
    /// registration's price and solvability win.
    pub fn create_market(
        &mut self,
        good: &str,
        region: &str,
        initial_price: f64,
        solvable: bool,
    ) -> MarketId {
        let key = MarketKey::new(good, region);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = MarketId(self.markets.len());
        let cells = (0..self.max_period)
            .map(|period| Market::new(key.clone(), period, initial_price, solvable))
            .collect();
        debug!(market = %key, initial_price, solvable, "Registered market");
        self.markets.push(cells);
        self.index.insert(key, id);
        id
    }

    /// Look up a market id.
    pub fn market_id(&self, good: &str, region: &str) -> Option<MarketId> {
        self.index.get(&MarketKey::new(good, region)).copied()
    }

    /// Check whether a market exists.
    pub fn has_market(&self, good: &str, region: &str) -> bool {
        self.market_id(good, region).is_some()
    }

    /// All market ids in registration order.
    pub fn market_ids(&self) -> impl Iterator<Item = MarketId> + '_ {
        (0..self.markets.len()).map(MarketId)
    }

    /// Ids of markets the solver clears, in registration order.
    pub fn solvable_markets(&self, period: Period) -> Vec<MarketId> {
        self.market_ids()
            .filter(|id| {
                self.cell(*id, period)
                    .map(Market::is_solvable)
                    .unwrap_or(false)
            })
            .collect()
    }

    fn check_period(&self, period: Period) -> Result<()> {
        if period >= self.max_period {
            return Err(MarketplaceError::PeriodOutOfRange {
                period,
                max_period: self.max_period,
            });
        }
        Ok(())
    }

    /// Market cell by id.
    pub fn cell(&self, id: MarketId, period: Period) -> Option<&Market> {
        self.markets.get(id.0).and_then(|cells| cells.get(period))
    }

    fn cell_mut(&mut self, id: MarketId, period: Period) -> Option<&mut Market> {
        self.markets.get_mut(id.0).and_then(|cells| cells.get_mut(period))
    }

    /// Market cell by name.
    pub fn market(&self, good: &str, region: &str, period: Period) -> Result<&Market> {
        self.check_period(period)?;
        let id = self
            .market_id(good, region)
            .ok_or_else(|| MarketplaceError::UnknownMarket(MarketKey::new(good, region)))?;
        self.cell(id, period)
            .ok_or_else(|| MarketplaceError::UnknownMarket(MarketKey::new(good, region)))
    }

    fn market_mut(&mut self, good: &str, region: &str, period: Period) -> Result<&mut Market> {
        self.check_period(period)?;
        let id = self
            .market_id(good, region)
            .ok_or_else(|| MarketplaceError::UnknownMarket(MarketKey::new(good, region)))?;
        self.cell_mut(id, period)
            .ok_or_else(|| MarketplaceError::UnknownMarket(MarketKey::new(good, region)))
    }

    // =========================================================================
    // Prices
    // =========================================================================

    /// Set every cell's price to its initial price.
    ///
    /// Must run exactly once, before the first period is solved.
    pub fn init_prices(&mut self) -> Result<()> {
        if self.prices_initialized {
            return Err(MarketplaceError::PricesAlreadyInitialized);
        }
        for market in self.markets.iter_mut().flatten() {
            market.init_price();
        }
        self.prices_initialized = true;
        Ok(())
    }

    /// Whether `init_prices` has run.
    pub fn prices_initialized(&self) -> bool {
        self.prices_initialized
    }

    /// Current price of a market.
    pub fn price(&self, good: &str, region: &str, period: Period) -> Result<f64> {
        self.market(good, region, period).map(Market::price)
    }

    /// Current price by id. Unknown ids read as zero.
    pub fn price_of(&self, id: MarketId, period: Period) -> f64 {
        self.cell(id, period).map(Market::price).unwrap_or(0.0)
    }

    /// Set the trial price of a market.
    pub fn set_price_of(&mut self, id: MarketId, period: Period, price: f64) {
        if let Some(market) = self.cell_mut(id, period) {
            market.set_price(price);
        }
    }

    /// Set the price of a market by name.
    pub fn set_price(
        &mut self,
        good: &str,
        region: &str,
        period: Period,
        price: f64,
    ) -> Result<()> {
        self.market_mut(good, region, period)?.set_price(price);
        Ok(())
    }

    // =========================================================================
    // Accumulation
    // =========================================================================

    /// Add to a market's supply.
    ///
    /// Pure accumulation: the order of calls within a period does not change
    /// the total.
    pub fn add_to_supply(
        &mut self,
        good: &str,
        region: &str,
        amount: f64,
        period: Period,
    ) -> Result<()> {
        let market = self.market_mut(good, region, period)?;
        market.add_to_supply(amount).map_err(|err| {
            warn!(market = %market.key(), period, amount, %err, "Rejected supply contribution");
            MarketplaceError::quantity(err, market.key().clone(), period, amount)
        })
    }

    /// Add to a market's demand.
    pub fn add_to_demand(
        &mut self,
        good: &str,
        region: &str,
        amount: f64,
        period: Period,
    ) -> Result<()> {
        let market = self.market_mut(good, region, period)?;
        market.add_to_demand(amount).map_err(|err| {
            warn!(market = %market.key(), period, amount, %err, "Rejected demand contribution");
            MarketplaceError::quantity(err, market.key().clone(), period, amount)
        })
    }

    /// Current supply of a market.
    pub fn supply(&self, good: &str, region: &str, period: Period) -> Result<f64> {
        self.market(good, region, period).map(Market::supply)
    }

    /// Current demand of a market.
    pub fn demand(&self, good: &str, region: &str, period: Period) -> Result<f64> {
        self.market(good, region, period).map(Market::demand)
    }

    /// Demand minus supply by id. Unknown ids read as zero.
    pub fn excess_demand_of(&self, id: MarketId, period: Period) -> f64 {
        self.cell(id, period).map(Market::excess_demand).unwrap_or(0.0)
    }

    // =========================================================================
    // Period protocol
    // =========================================================================

    /// Zero every market's supply in a period.
    pub fn null_supplies(&mut self, period: Period) {
        for cells in &mut self.markets {
            if let Some(market) = cells.get_mut(period) {
                market.null_supply();
            }
        }
    }

    /// Zero every market's demand in a period.
    pub fn null_demands(&mut self, period: Period) {
        for cells in &mut self.markets {
            if let Some(market) = cells.get_mut(period) {
                market.null_demand();
            }
        }
    }

    /// Zero supply and demand for every market in a period.
    pub fn reset_period(&mut self, period: Period) {
        if period >= self.max_period {
            warn!(period, "reset_period called outside the model horizon");
            return;
        }
        self.null_demands(period);
        self.null_supplies(period);
    }

    /// Save the previous period's committed values into each market.
    pub fn store_to_last(&mut self, period: Period) {
        if period == 0 || period >= self.max_period {
            return;
        }
        for cells in &mut self.markets {
            let (before, after) = cells.split_at_mut(period);
            after[0].store_to_last(&before[period - 1]);
        }
    }

    /// Start each market from the previous period's price.
    pub fn init_to_last(&mut self, period: Period) {
        if period == 0 || period >= self.max_period {
            return;
        }
        for cells in &mut self.markets {
            cells[period].init_to_last();
        }
    }

    /// Copy the previous period's state into this period's starting state.
    pub fn carry_forward(&mut self, period: Period) {
        self.store_to_last(period);
        self.init_to_last(period);
    }

    // =========================================================================
    // Market info
    // =========================================================================

    /// Info attached to a market in a period, if any.
    pub fn market_info(&self, good: &str, region: &str, period: Period) -> Option<&MarketInfo> {
        self.info.get(&(MarketKey::new(good, region), period))
    }

    /// Mutable info attached to a market in a period.
    ///
    /// With `create_if_missing` an empty attachment is created on demand;
    /// without it a missing attachment is [`MarketplaceError::InfoNotFound`].
    pub fn market_info_mut(
        &mut self,
        good: &str,
        region: &str,
        period: Period,
        create_if_missing: bool,
    ) -> Result<&mut MarketInfo> {
        self.check_period(period)?;
        let key = (MarketKey::new(good, region), period);
        if create_if_missing {
            return Ok(self.info.entry(key).or_default());
        }
        match self.info.get_mut(&key) {
            Some(info) => Ok(info),
            None => Err(MarketplaceError::InfoNotFound { key: key.0, period }),
        }
    }
}

impl ToDebugXml for Marketplace {
    fn to_debug_xml(&self, period: Period, out: &mut XmlWriter<'_>) -> io::Result<()> {
        out.open("Marketplace", &[])?;
        for cells in &self.markets {
            let Some(market) = cells.get(period) else {
                continue;
            };
            out.open(
                "market",
                &[
                    ("name", market.key().good.as_str()),
                    ("region", market.key().region.as_str()),
                ],
            )?;
            out.element("price", market.price())?;
            out.element("supply", market.supply())?;
            out.element("demand", market.demand())?;
            out.element("solvable", market.is_solvable())?;
            out.close("market")?;
        }
        out.close("Marketplace")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_market_place() -> Marketplace {
        let mut mp = Marketplace::new(3);
        mp.create_market("Forest", "USA", 2.0, true);
        mp.create_market("FutureForest", "USA", 1.0, true);
        mp.init_prices().unwrap();
        mp
    }

    #[test]
    fn test_registration_order_and_dedup() {
        let mut mp = Marketplace::new(2);
        let a = mp.create_market("Coal", "USA", 1.0, true);
        let b = mp.create_market("Oil", "USA", 1.0, true);
        let again = mp.create_market("Coal", "USA", 9.0, false);
        assert_eq!(a, MarketId(0));
        assert_eq!(b, MarketId(1));
        assert_eq!(again, a);
        assert_eq!(mp.len(), 2);
        assert_eq!(mp.solvable_markets(0), vec![a, b]);
    }

    #[test]
    fn test_unknown_market() {
        let mut mp = two_market_place();
        assert_eq!(
            mp.add_to_supply("Oil", "USA", 1.0, 0),
            Err(MarketplaceError::UnknownMarket(MarketKey::new("Oil", "USA")))
        );
        assert!(matches!(
            mp.add_to_supply("Forest", "USA", 1.0, 3),
            Err(MarketplaceError::PeriodOutOfRange { .. })
        ));
    }

    #[test]
    fn test_non_finite_contribution_rejected() {
        let mut mp = two_market_place();
        assert!(matches!(
            mp.add_to_demand("Forest", "USA", f64::NAN, 0),
            Err(MarketplaceError::NonFiniteQuantity { .. })
        ));
        assert_eq!(mp.demand("Forest", "USA", 0).unwrap(), 0.0);
    }

    #[test]
    fn test_out_of_range_contribution_rejected() {
        let mut mp = two_market_place();
        mp.add_to_demand("Forest", "USA", 1.0e29, 0).unwrap();
        assert!(matches!(
            mp.add_to_demand("Forest", "USA", 1.0e29, 0),
            Err(MarketplaceError::QuantityOutOfRange { .. })
        ));
        assert!(matches!(
            mp.add_to_supply("Forest", "USA", 1.0e34, 0),
            Err(MarketplaceError::QuantityOutOfRange { .. })
        ));
        assert_eq!(mp.supply("Forest", "USA", 0).unwrap(), 0.0);
        let demand = mp.demand("Forest", "USA", 0).unwrap();
        assert!((demand - 1.0e29).abs() / 1.0e29 < 1e-12);
    }

    #[test]
    fn test_reset_period_zeroes_every_market() {
        let mut mp = two_market_place();
        mp.add_to_supply("Forest", "USA", 4.0, 1).unwrap();
        mp.add_to_demand("Forest", "USA", 3.0, 1).unwrap();
        mp.add_to_supply("FutureForest", "USA", 2.0, 1).unwrap();
        mp.add_to_supply("Forest", "USA", 7.0, 0).unwrap();

        mp.reset_period(1);
        for id in mp.market_ids().collect::<Vec<_>>() {
            let market = mp.cell(id, 1).unwrap();
            assert_eq!(market.supply(), 0.0);
            assert_eq!(market.demand(), 0.0);
        }
        // Other periods untouched.
        assert_eq!(mp.supply("Forest", "USA", 0).unwrap(), 7.0);
    }

    #[test]
    fn test_carry_forward_uses_previous_period_only() {
        let mut mp = two_market_place();
        mp.set_price("Forest", "USA", 0, 5.0).unwrap();
        mp.add_to_supply("Forest", "USA", 10.0, 0).unwrap();
        mp.carry_forward(1);

        mp.set_price("Forest", "USA", 1, 6.0).unwrap();
        mp.add_to_supply("Forest", "USA", 11.0, 1).unwrap();
        mp.carry_forward(2);

        let cell = mp.market("Forest", "USA", 2).unwrap();
        assert_eq!(cell.stored_price(), 6.0);
        assert_eq!(cell.stored_supply(), 11.0);
        assert_eq!(cell.price(), 6.0);
    }

    #[test]
    fn test_carry_forward_period_zero_is_noop() {
        let mut mp = two_market_place();
        mp.carry_forward(0);
        assert_eq!(mp.price("Forest", "USA", 0).unwrap(), 2.0);
    }

    #[test]
    fn test_init_prices_only_once() {
        let mut mp = two_market_place();
        assert_eq!(
            mp.init_prices(),
            Err(MarketplaceError::PricesAlreadyInitialized)
        );
    }

    #[test]
    fn test_market_info_create_and_not_found() {
        let mut mp = two_market_place();
        assert!(matches!(
            mp.market_info_mut("Forest", "USA", 1, false),
            Err(MarketplaceError::InfoNotFound { .. })
        ));
        mp.market_info_mut("Forest", "USA", 1, true)
            .unwrap()
            .set_double("calVarCost", 1.25);
        let info = mp.market_info("Forest", "USA", 1).unwrap();
        assert_eq!(info.get_double("calVarCost"), Some(1.25));
        assert!(mp.market_info_mut("Forest", "USA", 1, false).is_ok());
        // Attachments do not require a registered market.
        assert!(mp.market_info_mut("Timber", "USA", 0, true).is_ok());
    }

    #[test]
    fn test_debug_xml() {
        let mp = two_market_place();
        let mut buf = Vec::new();
        let mut xml = XmlWriter::new(&mut buf);
        mp.to_debug_xml(0, &mut xml).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains(r#"<market name="Forest" region="USA">"#));
        assert!(text.contains("<price>2</price>"));
    }
}
