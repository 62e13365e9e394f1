//! Pro-rata settlement
//!
//! At the cleared price the short side of the market is filled in full and
//! the long side is rationed: every order on it receives the same fraction
//! `volume / side_total` of its size.

use bourse_core::{Price, Quantity, StepEvent};
use bourse_ports::{Fill, MarketView, Trader};
use log::debug;

/// Totals of one settlement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Settlement {
    pub price: Price,
    /// min(bids, offers)
    pub volume: Quantity,
    pub bids: Quantity,
    pub offers: Quantity,
    /// Fraction of each bid that was filled
    pub bid_fraction: f64,
    /// Fraction of each offer that was filled
    pub offer_fraction: f64,
}

/// Re-quote every trader at `price`, ration the volume pro-rata and hand each
/// trader its fill.
///
/// Constraints that cut a final order are reported as events.
pub fn settle_trades<T: Trader>(
    traders: &mut [T],
    price: Price,
    market: &dyn MarketView,
    events: &mut Vec<StepEvent>,
) -> Settlement {
    let quotes: Vec<_> = traders.iter().map(|t| t.demand(price, market)).collect();

    let bids: Quantity = quotes.iter().map(|q| q.bid()).sum();
    let offers: Quantity = quotes.iter().map(|q| q.offer()).sum();
    let volume = bids.min(offers).max(0.0);

    let bid_fraction = if bids > 0.0 { volume / bids } else { 0.0 };
    let offer_fraction = if offers > 0.0 { volume / offers } else { 0.0 };

    for (trader, quote) in traders.iter_mut().zip(&quotes) {
        if let Some((kind, requested)) = quote.constraint {
            events.push(StepEvent::DemandConstrained {
                agent: trader.id(),
                kind,
                requested,
                allowed: quote.demand,
            });
        }

        let quantity = if quote.demand > 0.0 {
            quote.demand * bid_fraction
        } else {
            quote.demand * offer_fraction
        };
        if quantity != 0.0 {
            trader.settle(Fill { quantity, price }, events);
        }
    }

    debug!("settled {volume:.4} at {price:.4} (bids {bids:.4}, offers {offers:.4})");

    Settlement {
        price,
        volume,
        bids,
        offers,
        bid_fraction,
        offer_fraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bourse_core::{AgentId, ConstraintKind, SignalBits, Time};
    use bourse_ports::{DemandQuote, Holdings};
    use rand::RngCore;

    /// Fixed order size, records fills
    struct FixedOrder {
        id: u32,
        quote: DemandQuote,
        position: Quantity,
        cash: f64,
    }

    impl FixedOrder {
        fn new(id: u32, demand: Quantity) -> Self {
            Self {
                id,
                quote: DemandQuote::new(demand, 0.0),
                position: 0.0,
                cash: 1000.0,
            }
        }
    }

    impl Trader for FixedOrder {
        fn id(&self) -> AgentId {
            AgentId(self.id)
        }
        fn kind(&self) -> &'static str {
            "fixed"
        }
        fn holdings(&self) -> Holdings {
            Holdings {
                cash: self.cash,
                position: self.position,
                wealth: self.cash,
                profit: 0.0,
            }
        }
        fn credit_earnings(&mut self, _: &dyn MarketView, _: &mut Vec<StepEvent>) {}
        fn match_conditions(&mut self, _: &dyn MarketView, _: &mut Vec<StepEvent>) {}
        fn demand(&self, _: Price, _: &dyn MarketView) -> DemandQuote {
            self.quote
        }
        fn settle(&mut self, fill: Fill, _: &mut Vec<StepEvent>) {
            self.position += fill.quantity;
            self.cash -= fill.quantity * fill.price;
        }
        fn update_performance(&mut self, _: &dyn MarketView, _: &mut Vec<StepEvent>) {}
        fn run_evolution(&mut self, _: Time, _: &mut dyn RngCore, _: &mut Vec<StepEvent>) -> Option<usize> {
            None
        }
    }

    struct StubMarket(SignalBits);

    impl MarketView for StubMarket {
        fn time(&self) -> Time {
            0
        }
        fn price(&self) -> Price {
            10.0
        }
        fn dividend(&self) -> f64 {
            1.0
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

    #[test]
    fn test_bid_side_rationed() {
        let mut traders = vec![
            FixedOrder::new(0, 4.0),
            FixedOrder::new(1, 2.0),
            FixedOrder::new(2, -3.0),
        ];
        let market = StubMarket(SignalBits::new(0));
        let mut events = Vec::new();

        let s = settle_trades(&mut traders, 10.0, &market, &mut events);

        assert_relative_eq!(s.volume, 3.0);
        assert_relative_eq!(s.bid_fraction, 0.5);
        assert_relative_eq!(s.offer_fraction, 1.0);
        assert_relative_eq!(traders[0].position, 2.0);
        assert_relative_eq!(traders[1].position, 1.0);
        assert_relative_eq!(traders[2].position, -3.0);
        assert_relative_eq!(traders[2].cash, 1030.0);
    }

    #[test]
    fn test_stock_is_conserved() {
        let mut traders = vec![
            FixedOrder::new(0, 1.7),
            FixedOrder::new(1, -0.3),
            FixedOrder::new(2, 2.9),
            FixedOrder::new(3, -4.4),
            FixedOrder::new(4, 0.0),
        ];
        let market = StubMarket(SignalBits::new(0));
        let mut events = Vec::new();

        let s = settle_trades(&mut traders, 12.5, &market, &mut events);

        assert_relative_eq!(s.volume, s.bids.min(s.offers));
        assert!(s.volume >= 0.0);
        let net: f64 = traders.iter().map(|t| t.position).sum();
        assert_relative_eq!(net, 0.0, epsilon = 1e-12);
        let cash: f64 = traders.iter().map(|t| t.cash).sum();
        assert_relative_eq!(cash, 5000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_one_sided_market_has_no_volume() {
        let mut traders = vec![FixedOrder::new(0, 3.0), FixedOrder::new(1, 1.0)];
        let market = StubMarket(SignalBits::new(0));
        let mut events = Vec::new();

        let s = settle_trades(&mut traders, 10.0, &market, &mut events);

        assert_eq!(s.volume, 0.0);
        assert!(traders.iter().all(|t| t.position == 0.0));
    }

    #[test]
    fn test_constraint_reported() {
        let mut trader = FixedOrder::new(7, 1.0);
        trader.quote.constraint = Some((ConstraintKind::MinCash, 5.0));
        let mut traders = vec![trader, FixedOrder::new(8, -1.0)];
        let market = StubMarket(SignalBits::new(0));
        let mut events = Vec::new();

        settle_trades(&mut traders, 10.0, &market, &mut events);

        assert_eq!(
            events,
            vec![StepEvent::DemandConstrained {
                agent: AgentId(7),
                kind: ConstraintKind::MinCash,
                requested: 5.0,
                allowed: 1.0,
            }]
        );
    }
}
