use bourse_core::{AgentId, ConstraintKind, Price, Quantity, StepEvent, Time};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::market::MarketView;

/// A trader's order at one trial price
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DemandQuote {
    /// Units wanted (positive buys, negative sells), after constraints
    pub demand: Quantity,
    /// d(demand)/d(price) at the trial price
    pub slope: f64,
    /// Constraint that cut the order, with the unconstrained size
    pub constraint: Option<(ConstraintKind, Quantity)>,
}

impl DemandQuote {
    pub fn new(demand: Quantity, slope: f64) -> Self {
        Self {
            demand,
            slope,
            constraint: None,
        }
    }

    #[inline]
    pub fn bid(&self) -> Quantity {
        self.demand.max(0.0)
    }

    #[inline]
    pub fn offer(&self) -> Quantity {
        (-self.demand).max(0.0)
    }
}

/// Executed quantity handed back to a trader after clearing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Signed units (positive bought, negative sold)
    pub quantity: Quantity,
    pub price: Price,
}

/// Cash and stock held by a trader
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Holdings {
    pub cash: f64,
    pub position: Quantity,
    pub wealth: f64,
    /// Exponential moving average of trading profit
    pub profit: f64,
}

/// Min/mean/max of one per-rule quantity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl Summary {
    /// Summary of `values`; all zeros when empty
    pub fn of(values: impl IntoIterator<Item = f64>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            min,
            mean: sum / count as f64,
            max,
        }
    }
}

/// Distribution of rule statistics across a trader's population
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleStats {
    pub rules: usize,
    pub active: usize,
    pub specificity: Summary,
    pub strength: Summary,
    pub variance: Summary,
}

/// Capability interface every kind of trader implements
///
/// The market calls these once per period, in this order:
/// `credit_earnings`, `match_conditions`, `demand` (once per trial price),
/// `settle`, `update_performance`, `run_evolution`.
pub trait Trader: Send {
    fn id(&self) -> AgentId;

    /// Short name of the trader kind
    fn kind(&self) -> &'static str;

    fn holdings(&self) -> Holdings;

    /// Credit dividends on the position and charge the risk-free return
    /// on its value
    fn credit_earnings(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>);

    /// Match conditions against the current signals and fix this period's forecast
    fn match_conditions(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>);

    /// Demand and slope at `trial_price`
    fn demand(&self, trial_price: Price, market: &dyn MarketView) -> DemandQuote;

    /// Apply an executed fill to cash and position
    fn settle(&mut self, fill: Fill, events: &mut Vec<StepEvent>);

    /// Score last period's forecasts against the realized price and dividend
    fn update_performance(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>);

    /// Evolve the trader's rules if due at `time`; returns the number of
    /// replaced rules when a generation ran
    fn run_evolution(
        &mut self,
        time: Time,
        rng: &mut dyn RngCore,
        events: &mut Vec<StepEvent>,
    ) -> Option<usize>;

    /// Rule population statistics, for traders that have rules
    fn rule_stats(&self) -> Option<RuleStats> {
        None
    }

    /// Period of the last genetic algorithm run
    fn last_ga_time(&self) -> Option<Time> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_sides() {
        let buy = DemandQuote::new(3.0, -0.5);
        assert_eq!(buy.bid(), 3.0);
        assert_eq!(buy.offer(), 0.0);

        let sell = DemandQuote::new(-2.0, -0.5);
        assert_eq!(sell.bid(), 0.0);
        assert_eq!(sell.offer(), 2.0);
    }

    #[test]
    fn test_summary() {
        let s = Summary::of([1.0, 2.0, 6.0]);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 6.0);
        assert_eq!(s.mean, 3.0);

        assert_eq!(Summary::of(std::iter::empty()), Summary::default());
    }
}
