//! Forecasting Rule
//!
//! A condition over the signal vector paired with a linear forecast
//! `E[p' + d'] = a * (p + d) + b * d + c`, plus the running accuracy
//! statistics the agent and its genetic algorithm select on.

use bourse_core::{Condition, Time, Trit};
use rand::Rng;

use crate::config::{ClassifierConfig, CoefficientRange};

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub condition: Condition,
    /// Coefficient on price + dividend
    pub a: f64,
    /// Coefficient on dividend
    pub b: f64,
    /// Constant term
    pub c: f64,
    /// Forecast of next period's price + dividend
    pub forecast: f64,
    /// Forecast held when the rule was last scored
    pub last_forecast: f64,
    /// Running squared forecast error
    pub variance: f64,
    pub strength: f64,
    /// Times matched since creation or last reset
    pub count: u64,
    pub last_active: Option<Time>,
    /// Last period the rule contributed to the agent's forecast
    pub last_used: Option<Time>,
    pub birth: Time,
}

/// Uniform draw from the centred `subrange` share of `range`
fn draw_coefficient<R: Rng + ?Sized>(rng: &mut R, range: CoefficientRange, subrange: f64) -> f64 {
    let width = range.width();
    let base = range.min + 0.5 * (1.0 - subrange) * width;
    base + rng.r#gen::<f64>() * subrange * width
}

impl Rule {
    /// All-wildcard rule with coefficients drawn from the configured ranges
    pub fn wildcard<R: Rng + ?Sized>(
        config: &ClassifierConfig,
        signal_len: usize,
        birth: Time,
        rng: &mut R,
    ) -> Self {
        let a = draw_coefficient(rng, config.a_range, config.subrange);
        let b = draw_coefficient(rng, config.b_range, config.subrange);
        let c = draw_coefficient(rng, config.c_range, config.subrange);
        Self::with_condition(Condition::new(signal_len), a, b, c, config.init_var, birth)
    }

    /// Rule with random coefficients and each bit specified with
    /// probability `bit_prob`, to 0 or 1 evenly
    pub fn random<R: Rng + ?Sized>(
        config: &ClassifierConfig,
        signal_len: usize,
        birth: Time,
        rng: &mut R,
    ) -> Self {
        let mut rule = Self::wildcard(config, signal_len, birth, rng);
        for i in 0..signal_len {
            if rng.gen_bool(config.bit_prob) {
                rule.condition.set(i, Trit::from_bool(rng.gen_bool(0.5)));
            }
        }
        rule
    }

    pub fn with_condition(condition: Condition, a: f64, b: f64, c: f64, variance: f64, birth: Time) -> Self {
        Self {
            condition,
            a,
            b,
            c,
            forecast: 0.0,
            last_forecast: 0.0,
            variance,
            strength: 0.0,
            count: 0,
            last_active: None,
            last_used: None,
            birth,
        }
    }

    #[inline]
    pub fn specificity(&self) -> usize {
        self.condition.specificity()
    }

    /// Recompute the forecast from the latest price and dividend
    pub fn update_forecast(&mut self, price: f64, dividend: f64) {
        self.forecast = self.a * (price + dividend) + self.b * dividend + self.c;
    }

    /// Forecast coefficients collapsed to `pdcoeff * (p + d) + offset`,
    /// given the current dividend
    #[inline]
    pub fn linear_form(&self, dividend: f64) -> (f64, f64) {
        (self.a, self.b * dividend + self.c)
    }

    /// Score the forecast the rule held against the realized `target`.
    ///
    /// Squared error is capped at `max_dev`; the averaging weight is
    /// `1 / (1 + count)` until the rule has been matched `tauv` times.
    pub fn score(&mut self, target: f64, tauv: f64, max_dev: f64, bit_cost: f64) {
        let err = target - self.last_forecast;
        let err_sq = (err * err).min(max_dev);
        let weight = if self.count as f64 > tauv {
            1.0 / tauv
        } else {
            1.0 / (1.0 + self.count as f64)
        };
        self.variance = (1.0 - weight) * self.variance + weight * err_sq;
        self.refresh_strength(max_dev, bit_cost);
    }

    /// Strength rewards low variance and penalizes specificity
    pub fn refresh_strength(&mut self, max_dev: f64, bit_cost: f64) {
        self.strength = max_dev - self.variance - bit_cost * self.specificity() as f64;
    }

    pub fn coefficients(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    pub fn set_coefficients(&mut self, [a, b, c]: [f64; 3]) {
        self.a = a;
        self.b = b;
        self.c = c;
    }
}
