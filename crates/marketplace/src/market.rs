//! A single market cell: one good in one region in one period.

use types::{MarketKey, Period, Quantity, QuantityError};

/// One clearable good × region × period cell.
///
/// Supply and demand are accumulators: technologies and consumers add to
/// them during a calculation pass and the marketplace zeroes them at the
/// start of each period (and the solver before each trial).
#[derive(Debug, Clone)]
pub struct Market {
    key: MarketKey,
    period: Period,
    /// Price the market starts from when prices are initialized.
    initial_price: f64,
    /// Current (trial) price.
    price: f64,
    supply: Quantity,
    demand: Quantity,
    /// Previous period's committed price.
    stored_price: f64,
    /// Previous period's committed supply.
    stored_supply: f64,
    /// Previous period's committed demand.
    stored_demand: f64,
    /// Whether the solver clears this market.
    solvable: bool,
}

impl Market {
    /// Create a market cell.
    pub fn new(key: MarketKey, period: Period, initial_price: f64, solvable: bool) -> Self {
        Self {
            key,
            period,
            initial_price,
            price: initial_price,
            supply: Quantity::ZERO,
            demand: Quantity::ZERO,
            stored_price: 0.0,
            stored_supply: 0.0,
            stored_demand: 0.0,
            solvable,
        }
    }

    pub fn key(&self) -> &MarketKey {
        &self.key
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }

    pub fn initial_price(&self) -> f64 {
        self.initial_price
    }

    pub fn supply(&self) -> f64 {
        self.supply.to_float()
    }

    pub fn demand(&self) -> f64 {
        self.demand.to_float()
    }

    /// Demand minus supply.
    pub fn excess_demand(&self) -> f64 {
        match self.demand.checked_sub(self.supply) {
            Ok(excess) => excess.to_float(),
            Err(_) => self.demand() - self.supply(),
        }
    }

    pub fn is_solvable(&self) -> bool {
        self.solvable
    }

    pub fn stored_price(&self) -> f64 {
        self.stored_price
    }

    pub fn stored_supply(&self) -> f64 {
        self.stored_supply
    }

    pub fn stored_demand(&self) -> f64 {
        self.stored_demand
    }

    /// Add to the supply accumulator. On error nothing is added.
    pub fn add_to_supply(&mut self, amount: f64) -> Result<(), QuantityError> {
        self.supply = self.supply.checked_add(Quantity::from_float(amount)?)?;
        Ok(())
    }

    /// Add to the demand accumulator. On error nothing is added.
    pub fn add_to_demand(&mut self, amount: f64) -> Result<(), QuantityError> {
        self.demand = self.demand.checked_add(Quantity::from_float(amount)?)?;
        Ok(())
    }

    pub fn null_supply(&mut self) {
        self.supply = Quantity::ZERO;
    }

    pub fn null_demand(&mut self) {
        self.demand = Quantity::ZERO;
    }

    /// Reset the working price to the initial price.
    pub fn init_price(&mut self) {
        self.price = self.initial_price;
    }

    /// Save the previous period's committed values.
    pub fn store_to_last(&mut self, last: &Market) {
        self.stored_price = last.price;
        self.stored_supply = last.supply();
        self.stored_demand = last.demand();
    }

    /// Start this period's search from the previous period's price.
    ///
    /// A non-positive previous price carries no information, so the cell
    /// keeps its own starting price.
    pub fn init_to_last(&mut self) {
        if self.stored_price > 0.0 {
            self.price = self.stored_price;
        }
    }
}
