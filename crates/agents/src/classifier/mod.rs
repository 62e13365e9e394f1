//! Classifier Agent
//!
//! A trader that forecasts next period's price + dividend with a population
//! of condition/forecast rules and evolves them with a genetic algorithm.
//!
//! Per period:
//! 1. `match_conditions`: recompute the active set, combine the eligible
//!    rules into `pdcoeff` and `offset`, fix the demand divisor
//! 2. `demand`: `(forecast - p(1 + r)) / (lambda * variance)` at each trial price
//! 3. `update_performance`: score the previously active rules, refresh the
//!    active rules' forecasts
//! 4. `run_evolution`: a generation when one is due

pub mod genetic;

use bourse_core::{AgentId, Ewma, Price, SignalBits, StepEvent, Time};
use bourse_ports::{ConfigResult, DemandQuote, Fill, Holdings, MarketView, RuleStats, Summary, Trader};
use log::{debug, info};
use rand::{Rng, RngCore};

use crate::account::Account;
use crate::config::{AccountConfig, ClassifierConfig, ForecastCombination};
use crate::rule::Rule;

pub use genetic::{Generation, run_generation};

/// Weight of a new squared error in the agent's own variance estimate
const AGENT_VARIANCE_WEIGHT: f64 = 0.01;

/// Linear forecast `pdcoeff * (p + d) + offset` with its variance
#[derive(Debug, Clone, Copy, PartialEq)]
struct Combined {
    pdcoeff: f64,
    offset: f64,
    variance: f64,
}

#[derive(Debug, Clone)]
pub struct ClassifierAgent {
    id: AgentId,
    config: ClassifierConfig,
    account: Account,
    rules: Vec<Rule>,
    active: Vec<usize>,
    previous_active: Vec<usize>,
    pdcoeff: f64,
    offset: f64,
    /// `risk_aversion * variance` for this period's demand
    divisor: f64,
    /// Agent's forecast of next period's price + dividend
    forecast: f64,
    /// Own squared-error average, used in individual mode
    variance: Ewma,
    /// Average of realized price + dividend
    global_mean: Ewma,
    /// Latest price and dividend seen by `update_performance`
    last_seen: (Price, f64),
    /// Period of the last `match_conditions`
    matched_at: Option<Time>,
    generations: u64,
    last_ga_time: Option<Time>,
}

impl ClassifierAgent {
    /// Agent with a fresh random rule population.
    ///
    /// Rule 0 is the all-wildcard default. Fails on an invalid classifier
    /// or account configuration before drawing anything from `rng`.
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        config: ClassifierConfig,
        account: &AccountConfig,
        signal_len: usize,
        market: &dyn MarketView,
        rng: &mut R,
    ) -> ConfigResult<Self> {
        config.validate()?;
        account.validate()?;

        let (price, dividend) = (market.price(), market.dividend());
        let time = market.time();

        let mut rules = Vec::with_capacity(config.num_rules);
        rules.push(Rule::wildcard(&config, signal_len, time, rng));
        for _ in 1..config.num_rules {
            rules.push(Rule::random(&config, signal_len, time, rng));
        }
        for rule in &mut rules {
            rule.update_forecast(price, dividend);
            rule.last_forecast = rule.forecast;
        }

        let target = price + dividend;
        let divisor = config.risk_aversion * config.init_var;
        Ok(Self {
            id,
            account: Account::new(account, price),
            rules,
            active: Vec::new(),
            previous_active: Vec::new(),
            pdcoeff: 0.0,
            offset: target,
            divisor,
            forecast: target,
            variance: Ewma::with_alpha(AGENT_VARIANCE_WEIGHT, config.init_var),
            global_mean: Ewma::with_alpha(1.0 / config.tauv, target),
            last_seen: (price, dividend),
            matched_at: None,
            generations: 0,
            last_ga_time: None,
            config,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Indices of the rules matched this period
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    #[inline]
    pub fn pdcoeff(&self) -> f64 {
        self.pdcoeff
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[inline]
    pub fn forecast(&self) -> f64 {
        self.forecast
    }

    #[inline]
    pub fn global_mean(&self) -> f64 {
        self.global_mean.value()
    }

    #[inline]
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Indices of the rules whose condition matches `signals`, ascending
    pub fn active_set(&self, signals: &SignalBits) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.condition.matches(signals))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether a generation runs at `time`
    pub fn evolution_due(&self, time: Time) -> bool {
        let ga = &self.config.ga;
        ga.enabled && time >= ga.first_time && (time - ga.first_time) % ga.interval == 0
    }

    /// Strength-proportional average over positively strong rules
    fn weighted(&self, indices: &[usize], dividend: f64) -> Option<Combined> {
        let total: f64 = indices.iter().map(|&i| self.rules[i].strength.max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut combined = Combined {
            pdcoeff: 0.0,
            offset: 0.0,
            variance: 0.0,
        };
        for &i in indices {
            let rule = &self.rules[i];
            let w = rule.strength.max(0.0) / total;
            let (pdcoeff, offset) = rule.linear_form(dividend);
            combined.pdcoeff += w * pdcoeff;
            combined.offset += w * offset;
            combined.variance += w * rule.variance;
        }
        Some(combined)
    }

    /// Strongest rule, then lowest variance, then lowest index
    fn best(&self, indices: &[usize]) -> Option<usize> {
        indices.iter().copied().reduce(|best, i| {
            let (a, b) = (&self.rules[best], &self.rules[i]);
            if b.strength > a.strength || (b.strength == a.strength && b.variance < a.variance) {
                i
            } else {
                best
            }
        })
    }

    fn combine(&mut self, eligible: &[usize], time: Time, dividend: f64) -> Option<Combined> {
        if self.config.combination == ForecastCombination::Weighted {
            if let Some(combined) = self.weighted(eligible, dividend) {
                for &i in eligible {
                    if self.rules[i].strength > 0.0 {
                        self.rules[i].last_used = Some(time);
                    }
                }
                return Some(combined);
            }
        }

        let i = self.best(eligible)?;
        let rule = &mut self.rules[i];
        rule.last_used = Some(time);
        let (pdcoeff, offset) = rule.linear_form(dividend);
        Some(Combined {
            pdcoeff,
            offset,
            variance: rule.variance,
        })
    }

    /// Forecast when no active rule is eligible: the strength-weighted
    /// average of every mature rule, or else the running mean of p + d
    fn fallback(&self, dividend: f64) -> Combined {
        let mature: Vec<usize> = (0..self.rules.len())
            .filter(|&i| self.rules[i].count >= self.config.min_count)
            .collect();
        if let Some(combined) = self.weighted(&mature, dividend) {
            return combined;
        }
        if !mature.is_empty() {
            let n = mature.len() as f64;
            let mut combined = Combined {
                pdcoeff: 0.0,
                offset: 0.0,
                variance: 0.0,
            };
            for &i in &mature {
                let (pdcoeff, offset) = self.rules[i].linear_form(dividend);
                combined.pdcoeff += pdcoeff / n;
                combined.offset += offset / n;
                combined.variance += self.rules[i].variance / n;
            }
            return combined;
        }
        Combined {
            pdcoeff: 0.0,
            offset: self.global_mean.value(),
            variance: self.variance.value(),
        }
    }
}

impl Trader for ClassifierAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "classifier"
    }

    fn holdings(&self) -> Holdings {
        self.account.holdings()
    }

    fn credit_earnings(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        self.account.credit_earnings(self.id, market, events);
    }

    /// Runs once per period; a repeated call in the same period keeps the
    /// first call's active set, counts and forecast.
    fn match_conditions(&mut self, market: &dyn MarketView, events: &mut Vec<StepEvent>) {
        let time = market.time();
        if self.matched_at == Some(time) {
            debug!("{} already matched at t={time}", self.id);
            return;
        }
        self.matched_at = Some(time);
        let dividend = market.dividend();

        for rule in &mut self.rules {
            rule.last_forecast = rule.forecast;
        }
        let active = self.active_set(market.signals());
        self.previous_active = std::mem::replace(&mut self.active, active);
        for &i in &self.active {
            let rule = &mut self.rules[i];
            rule.count += 1;
            rule.last_active = Some(time);
        }

        let eligible: Vec<usize> = self
            .active
            .iter()
            .copied()
            .filter(|&i| self.rules[i].count >= self.config.min_count)
            .collect();
        let combined = match self.combine(&eligible, time, dividend) {
            Some(combined) => combined,
            None => self.fallback(dividend),
        };
        self.pdcoeff = combined.pdcoeff;
        self.offset = combined.offset;

        let mut variance = if self.config.individual {
            self.variance.value()
        } else {
            combined.variance
        };
        if !(variance >= self.config.min_variance) {
            events.push(StepEvent::VarianceFloored {
                agent: self.id,
                variance,
            });
            variance = self.config.min_variance;
        }
        self.divisor = self.config.risk_aversion * variance;

        debug!(
            "{} t={time}: {} active, {} eligible, pdcoeff {:.4}, offset {:.4}",
            self.id,
            self.active.len(),
            eligible.len(),
            self.pdcoeff,
            self.offset
        );
    }

    fn demand(&self, trial_price: Price, market: &dyn MarketView) -> DemandQuote {
        let gross = 1.0 + market.interest_rate();
        let raw = self.pdcoeff * (trial_price + market.dividend()) + self.offset;
        let (forecast, dforecast) = if raw > 0.0 { (raw, self.pdcoeff) } else { (0.0, 0.0) };

        let demand = (forecast - trial_price * gross) / self.divisor;
        let slope = (dforecast - gross) / self.divisor;
        self.account.constrain(demand, slope, trial_price, self.config.max_bid)
    }

    fn settle(&mut self, fill: Fill, events: &mut Vec<StepEvent>) {
        self.account.settle(self.id, fill, events);
    }

    fn update_performance(&mut self, market: &dyn MarketView, _events: &mut Vec<StepEvent>) {
        let time = market.time();
        let (price, dividend) = (market.price(), market.dividend());
        let target = price + dividend;
        let config = &self.config;

        let deviation = target - self.forecast;
        if time < 1 {
            self.variance.reset(config.init_var);
        } else {
            self.variance.update((deviation * deviation).min(config.max_dev));
        }
        self.global_mean.update(target);

        if time > 0 {
            for &i in &self.previous_active {
                self.rules[i].score(target, config.tauv, config.max_dev, config.bit_cost);
            }
        }
        for &i in &self.active {
            self.rules[i].update_forecast(price, dividend);
        }

        self.forecast = self.pdcoeff * target + self.offset;
        self.last_seen = (price, dividend);
        self.account.mark(market);
    }

    fn run_evolution(&mut self, time: Time, rng: &mut dyn RngCore, events: &mut Vec<StepEvent>) -> Option<usize> {
        if !self.evolution_due(time) {
            return None;
        }

        let (price, dividend) = self.last_seen;
        let generation = run_generation(&mut self.rules, &self.config, time, price, dividend, rng);
        // Replaced rules start over; they have no forecast to score yet
        self.active.retain(|i| !generation.replaced.contains(i));

        self.generations += 1;
        self.last_ga_time = Some(time);
        let replaced = generation.replaced.len();
        info!(
            "{} generation {} at t={time}: replaced {replaced}, generalized {}",
            self.id, self.generations, generation.generalized
        );
        events.push(StepEvent::GeneticRun {
            agent: self.id,
            time,
            replaced,
        });
        Some(replaced)
    }

    fn rule_stats(&self) -> Option<RuleStats> {
        Some(RuleStats {
            rules: self.rules.len(),
            active: self.active.len(),
            specificity: Summary::of(self.rules.iter().map(|r| r.specificity() as f64)),
            strength: Summary::of(self.rules.iter().map(|r| r.strength)),
            variance: Summary::of(self.rules.iter().map(|r| r.variance)),
        })
    }

    fn last_ga_time(&self) -> Option<Time> {
        self.last_ga_time
    }
}
