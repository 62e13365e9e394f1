//! Trader Account
//!
//! Cash, stock position and the budget constraints every trader kind obeys.

use bourse_core::{AgentId, ConstraintKind, Price, Quantity, StepEvent};
use bourse_ports::{DemandQuote, Fill, Holdings, MarketView};

use crate::config::AccountConfig;

#[derive(Debug, Clone)]
pub struct Account {
    cash: f64,
    position: Quantity,
    wealth: f64,
    profit: f64,
    /// Position held when the period's earnings were credited
    position_at_open: Quantity,
    min_cash: f64,
    min_holding: Quantity,
    profit_decay: f64,
}

impl Account {
    pub fn new(config: &AccountConfig, price: Price) -> Self {
        Self {
            cash: config.initial_cash,
            position: config.init_holding,
            wealth: config.initial_cash + price * config.init_holding,
            profit: 0.0,
            position_at_open: config.init_holding,
            min_cash: config.min_cash,
            min_holding: config.min_holding,
            profit_decay: (-1.0 / config.tau_p).exp(),
        }
    }

    #[inline]
    pub fn cash(&self) -> f64 {
        self.cash
    }

    #[inline]
    pub fn position(&self) -> Quantity {
        self.position
    }

    pub fn holdings(&self) -> Holdings {
        Holdings {
            cash: self.cash,
            position: self.position,
            wealth: self.wealth,
            profit: self.profit,
        }
    }

    /// Pay dividends on the position and charge interest on its value:
    /// `cash -= (p * r - d) * position`, floored at `min_cash`.
    pub fn credit_earnings(&mut self, id: AgentId, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        let price = market.price();
        let carry = price * market.interest_rate() - market.dividend();
        self.cash -= carry * self.position;
        self.floor_cash(id, events);
        self.position_at_open = self.position;
        self.wealth = self.cash + price * self.position;
    }

    /// Apply the order-size cap and budget constraints to a raw demand.
    ///
    /// The first constraint to bind is recorded together with the
    /// unconstrained size.
    pub fn constrain(&self, demand: Quantity, slope: f64, price: Price, max_bid: Quantity) -> DemandQuote {
        let requested = demand;
        let mut quote = DemandQuote::new(demand, slope);

        if quote.demand > max_bid {
            quote.demand = max_bid;
            quote.slope = 0.0;
            quote.constraint = Some((ConstraintKind::MaxBid, requested));
        } else if quote.demand < -max_bid {
            quote.demand = -max_bid;
            quote.slope = 0.0;
            quote.constraint = Some((ConstraintKind::MaxBid, requested));
        }

        if quote.demand > 0.0 {
            let spare = self.cash - self.min_cash;
            if quote.demand * price > spare {
                if spare > 0.0 {
                    quote.demand = spare / price;
                    quote.slope = -quote.demand / price;
                } else {
                    quote.demand = 0.0;
                    quote.slope = 0.0;
                }
                quote.constraint = Some((ConstraintKind::MinCash, requested));
            }
        } else if quote.demand + self.position < self.min_holding {
            quote.demand = (self.min_holding - self.position).min(0.0);
            quote.slope = 0.0;
            quote.constraint = Some((ConstraintKind::MinHolding, requested));
        }

        quote
    }

    /// Book an executed trade
    pub fn settle(&mut self, id: AgentId, fill: Fill, events: &mut Vec<StepEvent>) {
        self.position += fill.quantity;
        self.cash -= fill.quantity * fill.price;
        self.floor_cash(id, events);
        self.wealth = self.cash + fill.price * self.position;
    }

    /// Revalue at the period's price and fold the realized
    /// `profit_per_unit` on the opening position into the profit average
    pub fn mark(&mut self, market: &dyn MarketView) {
        let earned = market.profit_per_unit() * self.position_at_open;
        self.profit = self.profit_decay * self.profit + (1.0 - self.profit_decay) * earned;
        self.wealth = self.cash + market.price() * self.position;
    }

    fn floor_cash(&mut self, id: AgentId, events: &mut Vec<StepEvent>) {
        if self.cash < self.min_cash {
            events.push(StepEvent::CashFloored {
                agent: id,
                requested: self.cash,
                floor: self.min_cash,
            });
            self.cash = self.min_cash;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bourse_core::{SignalBits, Time};

    struct Flat {
        price: f64,
        dividend: f64,
        signals: SignalBits,
    }

    impl MarketView for Flat {
        fn time(&self) -> Time {
            1
        }
        fn price(&self) -> Price {
            self.price
        }
        fn dividend(&self) -> f64 {
            self.dividend
        }
        fn interest_rate(&self) -> f64 {
            0.1
        }
        fn profit_per_unit(&self) -> f64 {
            self.dividend
        }
        fn signals(&self) -> &SignalBits {
            &self.signals
        }
    }

    fn flat(price: f64, dividend: f64) -> Flat {
        Flat {
            price,
            dividend,
            signals: SignalBits::new(0),
        }
    }

    #[test]
    fn test_earnings_at_fundamental_price_are_neutral() {
        let mut account = Account::new(&AccountConfig::default(), 100.0);
        let mut events = Vec::new();
        // p * r == d
        account.credit_earnings(AgentId(0), &flat(100.0, 10.0), &mut events);
        assert_relative_eq!(account.cash(), 20000.0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_earnings_floor_cash() {
        let config = AccountConfig::default().with_cash(1.0).with_holding(5.0);
        let mut account = Account::new(&config, 100.0);
        let mut events = Vec::new();
        account.credit_earnings(AgentId(2), &flat(100.0, 0.0), &mut events);
        assert_eq!(account.cash(), 0.0);
        assert!(matches!(events[0], StepEvent::CashFloored { agent: AgentId(2), .. }));
    }

    #[test]
    fn test_max_bid() {
        let account = Account::new(&AccountConfig::default(), 10.0);
        let quote = account.constrain(25.0, -1.0, 10.0, 10.0);
        assert_eq!(quote.demand, 10.0);
        assert_eq!(quote.slope, 0.0);
        assert_eq!(quote.constraint, Some((ConstraintKind::MaxBid, 25.0)));
    }

    #[test]
    fn test_cash_limits_purchase() {
        let config = AccountConfig::default().with_cash(50.0);
        let account = Account::new(&config, 10.0);
        let quote = account.constrain(8.0, -1.0, 10.0, 10.0);
        assert_relative_eq!(quote.demand, 5.0);
        assert_relative_eq!(quote.slope, -0.5);
        assert_eq!(quote.constraint, Some((ConstraintKind::MinCash, 8.0)));
    }

    #[test]
    fn test_no_cash_no_purchase() {
        let config = AccountConfig::default().with_cash(0.0);
        let account = Account::new(&config, 10.0);
        let quote = account.constrain(3.0, -1.0, 10.0, 10.0);
        assert_eq!(quote.demand, 0.0);
    }

    #[test]
    fn test_holding_floor_limits_sale() {
        // position 1, floor -5: at most 6 can be sold
        let account = Account::new(&AccountConfig::default(), 10.0);
        let quote = account.constrain(-9.0, -1.0, 10.0, 10.0);
        assert_relative_eq!(quote.demand, -6.0);
        assert_eq!(quote.constraint, Some((ConstraintKind::MinHolding, -9.0)));
    }

    #[test]
    fn test_unconstrained_order_untouched() {
        let account = Account::new(&AccountConfig::default(), 10.0);
        let quote = account.constrain(-2.0, -0.3, 10.0, 10.0);
        assert_eq!(quote, DemandQuote::new(-2.0, -0.3));
    }

    #[test]
    fn test_settle_and_mark() {
        let mut account = Account::new(&AccountConfig::default(), 10.0);
        let mut events = Vec::new();
        account.settle(AgentId(0), Fill { quantity: 2.0, price: 10.0 }, &mut events);
        assert_relative_eq!(account.position(), 3.0);
        assert_relative_eq!(account.cash(), 19980.0);

        account.mark(&flat(10.0, 1.0));
        assert_relative_eq!(account.holdings().wealth, 19980.0 + 30.0);
        // Profit averages ppu on the opening position of 1
        let decay = (-1.0f64 / 50.0).exp();
        assert_relative_eq!(account.holdings().profit, 1.0 - decay);
    }
}
