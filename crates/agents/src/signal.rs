//! Signal Trader
//!
//! Buys `bid_size` whenever one chosen signal bit is set and sells it
//! otherwise. Useful as a trend-follower or contrarian foil to the
//! classifier population.

use bourse_core::{AgentId, Price, StepEvent, Time};
use bourse_ports::{DemandQuote, Fill, Holdings, MarketView, Trader};
use rand::RngCore;

use crate::account::Account;
use crate::config::{AccountConfig, SignalTraderConfig};

#[derive(Debug, Clone)]
pub struct SignalTrader {
    id: AgentId,
    config: SignalTraderConfig,
    account: Account,
    /// Key bit value fixed by the last `match_conditions`
    bullish: bool,
}

impl SignalTrader {
    pub fn new(id: AgentId, config: SignalTraderConfig, account: &AccountConfig, price: Price) -> Self {
        Self {
            id,
            config,
            account: Account::new(account, price),
            bullish: false,
        }
    }

    pub fn config(&self) -> &SignalTraderConfig {
        &self.config
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.bullish
    }
}

impl Trader for SignalTrader {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "signal"
    }

    fn holdings(&self) -> Holdings {
        self.account.holdings()
    }

    fn credit_earnings(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        self.account.credit_earnings(self.id, market, events);
    }

    fn match_conditions(&mut self, market: &dyn MarketView, _events: &mut Vec<StepEvent>) {
        self.bullish = market.signals().get(self.config.key_bit);
    }

    fn demand(&self, trial_price: Price, _market: &dyn MarketView) -> DemandQuote {
        let size = if self.bullish { self.config.bid_size } else { -self.config.bid_size };
        self.account.constrain(size, 0.0, trial_price, self.config.bid_size)
    }

    fn settle(&mut self, fill: Fill, events: &mut Vec<StepEvent>) {
        self.account.settle(self.id, fill, events);
    }

    fn update_performance(&mut self, market: &dyn MarketView, _events: &mut Vec<StepEvent>) {
        self.account.mark(market);
    }

    fn run_evolution(&mut self, _time: Time, _rng: &mut dyn RngCore, _events: &mut Vec<StepEvent>) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_core::SignalBits;

    struct Signals(SignalBits);

    impl MarketView for Signals {
        fn time(&self) -> Time {
            1
        }
        fn price(&self) -> Price {
            100.0
        }
        fn dividend(&self) -> f64 {
            10.0
        }
        fn interest_rate(&self) -> f64 {
            0.1
        }
        fn profit_per_unit(&self) -> f64 {
            0.0
        }
        fn signals(&self) -> &SignalBits {
            &self.0
        }
    }

    fn trader(key_bit: usize) -> SignalTrader {
        let config = SignalTraderConfig { bid_size: 2.0, key_bit };
        SignalTrader::new(AgentId(9), config, &AccountConfig::default(), 100.0)
    }

    #[test]
    fn test_follows_key_bit() {
        let market = Signals(SignalBits::from_bools(&[false, true, false]));
        let mut events = Vec::new();

        let mut buyer = trader(1);
        buyer.match_conditions(&market, &mut events);
        assert_eq!(buyer.demand(100.0, &market).demand, 2.0);

        let mut seller = trader(2);
        seller.match_conditions(&market, &mut events);
        assert_eq!(seller.demand(100.0, &market).demand, -2.0);
        assert_eq!(seller.demand(100.0, &market).slope, 0.0);
    }

    #[test]
    fn test_demand_still_constrained() {
        let market = Signals(SignalBits::from_bools(&[true]));
        let mut events = Vec::new();
        let config = SignalTraderConfig { bid_size: 2.0, key_bit: 0 };
        let account = AccountConfig::default().with_cash(50.0);
        let mut trader = SignalTrader::new(AgentId(1), config, &account, 100.0);
        trader.match_conditions(&market, &mut events);

        let quote = trader.demand(100.0, &market);
        assert_eq!(quote.demand, 0.5);
        assert!(quote.constraint.is_some());
    }
}
