//! Specialist
//!
//! Market maker that gropes for the price at which aggregate demand is
//! (nearly) zero. One clearing is a small state machine over iterations:
//!
//! ```text
//! Initial ──► Iterate ──(|excess| < tolerance or cap reached)──► Converged
//!               ▲   │
//!               └───┘ adjust trial price, clamp to [min_price, max_price]
//! ```
//!
//! The adjustment depends on the specialist type: a fixed or adaptive
//! proportional step, or a Newton step on the aggregate demand slope.

use bourse_core::{Price, Quantity, StepEvent};
use bourse_ports::{ConfigError, ConfigResult, MarketView, Trader};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Price adjustment policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistType {
    /// `p *= 1 + eta * excess` with constant eta
    FixedEta,
    /// Proportional step whose eta grows while the excess keeps its sign
    /// and shrinks when it flips
    #[default]
    AdaptiveEta,
    /// Seeded at `rea * dividend + reb`, then Newton steps on the demand slope
    RationalExpectations,
    /// Seeded at the previous price, then Newton steps on the demand slope
    Slope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistConfig {
    pub kind: SpecialistType,
    /// Step rate for `FixedEta`, and the fallback when the slope vanishes
    pub eta: f64,
    /// Starting rate for `AdaptiveEta`
    pub eta_initial: f64,
    /// Additive growth of the adaptive rate
    pub eta_increment: f64,
    pub eta_max: f64,
    pub eta_min: f64,
    /// Convergence threshold on |bids - offers|
    pub tolerance: f64,
    pub max_iterations: usize,
    pub min_price: Price,
    pub max_price: Price,
    /// Rational-expectations price slope on the dividend
    pub rea: f64,
    /// Rational-expectations price intercept
    pub reb: f64,
}

impl Default for SpecialistConfig {
    fn default() -> Self {
        Self {
            kind: SpecialistType::AdaptiveEta,
            eta: 0.0005,
            eta_initial: 0.0005,
            eta_increment: 0.0005,
            eta_max: 0.05,
            eta_min: 0.00001,
            tolerance: 0.01,
            max_iterations: 10,
            min_price: 0.001,
            max_price: 500.0,
            rea: 6.333855553,
            reb: 34.71196262,
        }
    }
}

impl SpecialistConfig {
    pub fn with_kind(mut self, kind: SpecialistType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    pub fn with_price_bounds(mut self, min_price: Price, max_price: Price) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigError::check_positive("specialist.eta", self.eta)?;
        ConfigError::check_positive("specialist.tolerance", self.tolerance)?;
        ConfigError::check_positive("specialist.min_price", self.min_price)?;
        if self.max_iterations == 0 {
            return Err(ConfigError::parameter("specialist.max_iterations", "must be at least 1"));
        }
        if !(self.max_price > self.min_price) || !self.max_price.is_finite() {
            return Err(ConfigError::parameter(
                "specialist.max_price",
                format!("{} must exceed min_price {}", self.max_price, self.min_price),
            ));
        }
        if self.kind == SpecialistType::AdaptiveEta {
            ConfigError::check_positive("specialist.eta_min", self.eta_min)?;
            if !(self.eta_min <= self.eta_initial && self.eta_initial <= self.eta_max) {
                return Err(ConfigError::parameter(
                    "specialist.eta_initial",
                    "must lie within [eta_min, eta_max]",
                ));
            }
            if !(self.eta_increment >= 0.0) {
                return Err(ConfigError::parameter("specialist.eta_increment", "must be non-negative"));
            }
        }
        if !self.rea.is_finite() || !self.reb.is_finite() {
            return Err(ConfigError::parameter("specialist.rea", "coefficients must be finite"));
        }
        Ok(())
    }
}

/// Outcome of one clearing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clearing {
    pub price: Price,
    /// Demand evaluations performed
    pub iterations: usize,
    pub converged: bool,
    /// bids - offers at the final price
    pub excess: Quantity,
    pub bids: Quantity,
    pub offers: Quantity,
}

#[derive(Debug, Clone, Copy)]
struct Aggregate {
    bids: Quantity,
    offers: Quantity,
    slope: f64,
}

fn aggregate<T: Trader>(traders: &[T], price: Price, market: &dyn MarketView) -> Aggregate {
    let mut total = Aggregate {
        bids: 0.0,
        offers: 0.0,
        slope: 0.0,
    };
    for trader in traders {
        let quote = trader.demand(price, market);
        total.bids += quote.bid();
        total.offers += quote.offer();
        total.slope += quote.slope;
    }
    total
}

#[derive(Debug, Clone)]
pub struct Specialist {
    config: SpecialistConfig,
    /// Current adaptive rate, carried across periods
    eta: f64,
}

impl Specialist {
    pub fn new(config: SpecialistConfig) -> ConfigResult<Self> {
        config.validate()?;
        let eta = match config.kind {
            SpecialistType::AdaptiveEta => config.eta_initial,
            _ => config.eta,
        };
        Ok(Self { config, eta })
    }

    pub fn config(&self) -> &SpecialistConfig {
        &self.config
    }

    /// Rate the next proportional step would use
    pub fn eta(&self) -> f64 {
        self.eta
    }

    fn clamp(&self, price: Price, events: &mut Vec<StepEvent>) -> Price {
        let clamped = if price.is_nan() {
            self.config.min_price
        } else {
            price.clamp(self.config.min_price, self.config.max_price)
        };
        if clamped != price {
            events.push(StepEvent::PriceClamped {
                requested: price,
                clamped,
            });
        }
        clamped
    }

    fn initial_price(&self, market: &dyn MarketView) -> Price {
        match self.config.kind {
            SpecialistType::RationalExpectations => {
                self.config.rea * market.dividend() + self.config.reb
            }
            _ => market.price(),
        }
    }

    fn proportional_step(&self, price: Price, excess: Quantity) -> Price {
        price * (1.0 + self.eta * excess)
    }

    fn adapt_eta(&mut self, sign: f64, last_sign: f64) {
        if sign == last_sign {
            self.eta = (self.eta + self.config.eta_increment).min(self.config.eta_max);
        } else {
            self.eta = (self.eta * 0.5).max(self.config.eta_min);
        }
    }

    fn next_price(&mut self, price: Price, total: &Aggregate, last_sign: f64) -> Price {
        let excess = total.bids - total.offers;
        match self.config.kind {
            SpecialistType::FixedEta => self.proportional_step(price, excess),
            SpecialistType::AdaptiveEta => {
                if last_sign != 0.0 {
                    self.adapt_eta(excess.signum(), last_sign);
                }
                self.proportional_step(price, excess)
            }
            SpecialistType::RationalExpectations | SpecialistType::Slope => {
                let newton = price - excess / total.slope;
                if total.slope != 0.0 && newton.is_finite() {
                    newton
                } else {
                    self.proportional_step(price, excess)
                }
            }
        }
    }

    /// Search for the clearing price.
    ///
    /// Never fails: when the iteration cap is reached the last trial price
    /// stands and a `ConvergenceFailure` event is recorded.
    pub fn clear<T: Trader>(
        &mut self,
        traders: &[T],
        market: &dyn MarketView,
        events: &mut Vec<StepEvent>,
    ) -> Clearing {
        let mut clamp_events = Vec::new();
        let mut price = self.clamp(self.initial_price(market), &mut clamp_events);
        let mut last_sign = 0.0;
        let mut iterations = 0;

        let (total, converged) = loop {
            iterations += 1;
            let total = aggregate(traders, price, market);
            let excess = total.bids - total.offers;
            debug!(
                "clearing iteration {iterations}: price {price:.4} bids {:.4} offers {:.4}",
                total.bids, total.offers
            );

            if excess.abs() < self.config.tolerance {
                break (total, true);
            }
            if iterations >= self.config.max_iterations {
                break (total, false);
            }

            clamp_events.clear();
            price = self.next_price(price, &total, last_sign);
            price = self.clamp(price, &mut clamp_events);
            last_sign = excess.signum();
        };

        events.append(&mut clamp_events);
        let excess = total.bids - total.offers;
        if !converged {
            warn!(
                "specialist did not converge in {iterations} iterations (excess {excess:.4}, price {price:.4})"
            );
            events.push(StepEvent::ConvergenceFailure {
                iterations,
                excess,
                price,
            });
        }

        Clearing {
            price,
            iterations,
            converged,
            excess,
            bids: total.bids,
            offers: total.offers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bourse_core::{AgentId, SignalBits, Time};
    use bourse_ports::{DemandQuote, Fill, Holdings};
    use rand::RngCore;

    /// demand = (target - price) * sensitivity
    struct LinearTrader {
        target: Price,
        sensitivity: f64,
    }

    impl Trader for LinearTrader {
        fn id(&self) -> AgentId {
            AgentId(0)
        }
        fn kind(&self) -> &'static str {
            "linear"
        }
        fn holdings(&self) -> Holdings {
            Holdings::default()
        }
        fn credit_earnings(&mut self, _: &dyn MarketView, _: &mut Vec<StepEvent>) {}
        fn match_conditions(&mut self, _: &dyn MarketView, _: &mut Vec<StepEvent>) {}
        fn demand(&self, trial_price: Price, _: &dyn MarketView) -> DemandQuote {
            DemandQuote::new((self.target - trial_price) * self.sensitivity, -self.sensitivity)
        }
        fn settle(&mut self, _: Fill, _: &mut Vec<StepEvent>) {}
        fn update_performance(&mut self, _: &dyn MarketView, _: &mut Vec<StepEvent>) {}
        fn run_evolution(&mut self, _: Time, _: &mut dyn RngCore, _: &mut Vec<StepEvent>) -> Option<usize> {
            None
        }
    }

    struct StubMarket {
        price: Price,
        dividend: f64,
        signals: SignalBits,
    }

    impl StubMarket {
        fn new(price: Price, dividend: f64) -> Self {
            Self {
                price,
                dividend,
                signals: SignalBits::new(0),
            }
        }
    }

    impl MarketView for StubMarket {
        fn time(&self) -> Time {
            0
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
            0.0
        }
        fn signals(&self) -> &SignalBits {
            &self.signals
        }
    }

    fn linear(target: Price) -> LinearTrader {
        LinearTrader {
            target,
            sensitivity: 1.0,
        }
    }

    #[test]
    fn test_fixed_eta_converges() {
        let config = SpecialistConfig::default()
            .with_kind(SpecialistType::FixedEta)
            .with_eta(0.1);
        let mut specialist = Specialist::new(config).unwrap();
        let market = StubMarket::new(12.0, 1.0);
        let mut events = Vec::new();

        let clearing = specialist.clear(&[linear(10.0)], &market, &mut events);

        assert!(clearing.converged);
        assert_relative_eq!(clearing.price, 10.0, epsilon = 0.01);
        assert!(clearing.iterations <= 10);
        assert!(events.is_empty());
    }

    #[test]
    fn test_slope_specialist_converges_in_one_step() {
        let config = SpecialistConfig::default().with_kind(SpecialistType::Slope);
        let mut specialist = Specialist::new(config).unwrap();
        let market = StubMarket::new(40.0, 1.0);
        let mut events = Vec::new();

        let clearing = specialist.clear(&[linear(25.0), linear(35.0)], &market, &mut events);

        // Linear demand: one Newton step lands on the root
        assert!(clearing.converged);
        assert_eq!(clearing.iterations, 2);
        assert_relative_eq!(clearing.price, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rational_expectations_seed() {
        let config = SpecialistConfig::default().with_kind(SpecialistType::RationalExpectations);
        let mut specialist = Specialist::new(config.clone()).unwrap();
        let market = StubMarket::new(10.0, 10.0);
        let seed = config.rea * 10.0 + config.reb;
        let mut events = Vec::new();

        // Trader already happy at the benchmark price
        let clearing = specialist.clear(&[linear(seed)], &market, &mut events);
        assert_eq!(clearing.iterations, 1);
        assert_relative_eq!(clearing.price, seed);
    }

    #[test]
    fn test_non_convergence_reports_event() {
        let config = SpecialistConfig::default()
            .with_kind(SpecialistType::FixedEta)
            .with_eta(0.0001)
            .with_max_iterations(3);
        let mut specialist = Specialist::new(config).unwrap();
        let market = StubMarket::new(50.0, 1.0);
        let mut events = Vec::new();

        let clearing = specialist.clear(&[linear(10.0)], &market, &mut events);

        assert!(!clearing.converged);
        assert_eq!(clearing.iterations, 3);
        assert!(matches!(
            events.as_slice(),
            [StepEvent::ConvergenceFailure { iterations: 3, .. }]
        ));
    }

    #[test]
    fn test_price_stays_within_bounds() {
        let config = SpecialistConfig::default()
            .with_kind(SpecialistType::FixedEta)
            .with_eta(1.0)
            .with_price_bounds(1.0, 20.0)
            .with_max_iterations(5);
        let mut specialist = Specialist::new(config).unwrap();
        let market = StubMarket::new(10.0, 1.0);

        for target in [0.0, 5.0, 15.0, 1000.0] {
            let mut events = Vec::new();
            let clearing = specialist.clear(&[linear(target)], &market, &mut events);
            assert!(
                (1.0..=20.0).contains(&clearing.price),
                "price {} out of bounds",
                clearing.price
            );
        }
    }

    #[test]
    fn test_adaptive_eta_grows_on_persistent_excess() {
        let config = SpecialistConfig {
            eta_initial: 0.001,
            eta_increment: 0.001,
            max_iterations: 4,
            ..SpecialistConfig::default()
        };
        let mut specialist = Specialist::new(config).unwrap();
        let market = StubMarket::new(10.0, 1.0);
        let mut events = Vec::new();

        // Excess stays positive over all iterations
        specialist.clear(&[linear(100.0)], &market, &mut events);
        assert!(specialist.eta() > 0.001);
    }

    #[test]
    fn test_adaptive_eta_shrinks_on_overshoot() {
        let config = SpecialistConfig {
            eta_initial: 0.04,
            eta_increment: 0.0,
            max_iterations: 3,
            ..SpecialistConfig::default()
        };
        let mut specialist = Specialist::new(config).unwrap();
        let market = StubMarket::new(20.0, 1.0);
        let mut events = Vec::new();

        // Steep demand makes each step overshoot
        let steep = LinearTrader {
            target: 10.0,
            sensitivity: 10.0,
        };
        specialist.clear(&[steep], &market, &mut events);
        assert!(specialist.eta() < 0.04);
    }

    #[test]
    fn test_invalid_config() {
        assert!(SpecialistConfig::default().with_price_bounds(5.0, 1.0).validate().is_err());
        assert!(SpecialistConfig::default().with_max_iterations(0).validate().is_err());
        assert!(SpecialistConfig::default().with_tolerance(0.0).validate().is_err());
        let bad_eta = SpecialistConfig {
            eta_initial: 1.0,
            ..SpecialistConfig::default()
        };
        assert!(bad_eta.validate().is_err());
    }
}
