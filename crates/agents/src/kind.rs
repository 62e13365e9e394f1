use bourse_core::{AgentId, Price, StepEvent, Time};
use bourse_ports::{DemandQuote, Fill, Holdings, MarketView, RuleStats, Trader};
use rand::RngCore;

use crate::classifier::ClassifierAgent;
use crate::signal::SignalTrader;

/// Every trader the market can host
#[derive(Debug, Clone)]
pub enum TraderKind {
    Classifier(ClassifierAgent),
    Signal(SignalTrader),
}

macro_rules! delegate {
    ($trader:expr, $t:ident => $body:expr) => {
        match $trader {
            TraderKind::Classifier($t) => $body,
            TraderKind::Signal($t) => $body,
        }
    };
}

impl TraderKind {
    pub fn as_classifier(&self) -> Option<&ClassifierAgent> {
        match self {
            TraderKind::Classifier(agent) => Some(agent),
            TraderKind::Signal(_) => None,
        }
    }
}

impl From<ClassifierAgent> for TraderKind {
    fn from(agent: ClassifierAgent) -> Self {
        TraderKind::Classifier(agent)
    }
}

impl From<SignalTrader> for TraderKind {
    fn from(trader: SignalTrader) -> Self {
        TraderKind::Signal(trader)
    }
}

impl Trader for TraderKind {
    fn id(&self) -> AgentId {
        delegate!(self, t => t.id())
    }

    fn kind(&self) -> &'static str {
        delegate!(self, t => t.kind())
    }

    fn holdings(&self) -> Holdings {
        delegate!(self, t => t.holdings())
    }

    fn credit_earnings(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        delegate!(self, t => t.credit_earnings(market, events))
    }

    fn match_conditions(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        delegate!(self, t => t.match_conditions(market, events))
    }

    fn demand(&self, trial_price: Price, market: &dyn MarketView) -> DemandQuote {
        delegate!(self, t => t.demand(trial_price, market))
    }

    fn settle(&mut self, fill: Fill, events: &mut Vec<StepEvent>) {
        delegate!(self, t => t.settle(fill, events))
    }

    fn update_performance(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        delegate!(self, t => t.update_performance(market, events))
    }

    fn run_evolution(&mut self, time: Time, rng: &mut dyn RngCore, events: &mut Vec<StepEvent>) -> Option<usize> {
        delegate!(self, t => t.run_evolution(time, rng, events))
    }

    fn rule_stats(&self) -> Option<RuleStats> {
        delegate!(self, t => t.rule_stats())
    }

    fn last_ga_time(&self) -> Option<Time> {
        delegate!(self, t => t.last_ga_time())
    }
}
