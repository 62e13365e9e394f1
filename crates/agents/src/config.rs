//! Agent configuration
//!
//! Defaults are the classic artificial stock market parameter set.

use bourse_ports::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Endowment and holding constraints shared by every trader kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub initial_cash: f64,
    /// Shares held at the start
    pub init_holding: f64,
    /// Position floor (negative allows short sales)
    pub min_holding: f64,
    /// Cash floor
    pub min_cash: f64,
    /// Time constant of the profit moving average
    pub tau_p: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_cash: 20000.0,
            init_holding: 1.0,
            min_holding: -5.0,
            min_cash: 0.0,
            tau_p: 50.0,
        }
    }
}

impl AccountConfig {
    pub fn with_cash(mut self, cash: f64) -> Self {
        self.initial_cash = cash;
        self
    }

    pub fn with_holding(mut self, holding: f64) -> Self {
        self.init_holding = holding;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigError::check_positive("account.tau_p", self.tau_p)?;
        if self.initial_cash < self.min_cash {
            return Err(ConfigError::parameter(
                "account.initial_cash",
                format!("{} is below min_cash {}", self.initial_cash, self.min_cash),
            ));
        }
        if self.init_holding < self.min_holding {
            return Err(ConfigError::parameter(
                "account.init_holding",
                format!("{} is below min_holding {}", self.init_holding, self.min_holding),
            ));
        }
        Ok(())
    }
}

/// Closed interval a forecast coefficient is drawn from and mutated within
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRange {
    pub min: f64,
    pub max: f64,
}

impl CoefficientRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    fn validate(&self, name: &'static str) -> ConfigResult<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min <= self.max) {
            return Err(ConfigError::parameter(name, "need finite min <= max"));
        }
        Ok(())
    }
}

/// How the eligible active rules become one forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastCombination {
    /// Strength-proportional average of the eligible rules
    #[default]
    Weighted,
    /// Strongest eligible rule, lower variance breaking ties
    Best,
}

/// Genetic algorithm cadence and operator probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub enabled: bool,
    /// Periods between generations
    pub interval: u64,
    /// First period a generation may run
    pub first_time: u64,
    /// Rules unmatched for longer than this are generalized after a generation
    pub long_time: u64,
    /// Fraction of the population replaced per generation
    pub pool_fraction: f64,
    pub p_crossover: f64,
    /// Crossover: share of strength-weighted coefficient blending
    pub p_linear: f64,
    /// Crossover: share of per-coefficient random inheritance
    pub p_random: f64,
    /// Per-bit mutation probability
    pub p_mutation: f64,
    /// Per-coefficient probability of a jump anywhere in the range
    pub p_long: f64,
    /// Per-coefficient probability of a local jump
    pub p_short: f64,
    /// Local jump radius as a fraction of the range
    pub nhood: f64,
    /// Fraction of specified bits dropped from a long-idle rule
    pub gen_fraction: f64,
    /// Per-bit probability an offspring's specified bit becomes don't-care
    pub p_generalize: f64,
    /// Weight of the variance MAD when seeding offspring variance
    pub variance_inflation: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 250,
            first_time: 250,
            long_time: 250,
            pool_fraction: 0.1,
            p_crossover: 0.3,
            p_linear: 0.333,
            p_random: 0.333,
            p_mutation: 0.01,
            p_long: 0.05,
            p_short: 0.2,
            nhood: 0.05,
            gen_fraction: 0.10,
            p_generalize: 0.01,
            variance_inflation: 1.0,
        }
    }
}

impl GeneticConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Rules replaced per generation in a population of `num_rules`
    pub fn pool_size(&self, num_rules: usize) -> usize {
        (self.pool_fraction * num_rules as f64).floor() as usize
    }

    pub fn validate(&self, num_rules: usize) -> ConfigResult<()> {
        for (name, p) in [
            ("ga.pool_fraction", self.pool_fraction),
            ("ga.p_crossover", self.p_crossover),
            ("ga.p_linear", self.p_linear),
            ("ga.p_random", self.p_random),
            ("ga.p_mutation", self.p_mutation),
            ("ga.p_long", self.p_long),
            ("ga.p_short", self.p_short),
            ("ga.nhood", self.nhood),
            ("ga.gen_fraction", self.gen_fraction),
            ("ga.p_generalize", self.p_generalize),
        ] {
            ConfigError::check_probability(name, p)?;
        }
        if self.p_linear + self.p_random > 1.0 {
            return Err(ConfigError::parameter("ga.p_linear", "p_linear + p_random exceeds 1"));
        }
        if self.p_long + self.p_short > 1.0 {
            return Err(ConfigError::parameter("ga.p_long", "p_long + p_short exceeds 1"));
        }
        if !(self.variance_inflation >= 0.0 && self.variance_inflation.is_finite()) {
            return Err(ConfigError::parameter("ga.variance_inflation", "must be non-negative"));
        }

        if !self.enabled {
            return Ok(());
        }
        if self.interval == 0 {
            return Err(ConfigError::parameter("ga.interval", "must be at least 1"));
        }
        if num_rules < 3 {
            return Err(ConfigError::InvalidPool(format!(
                "{num_rules} rules cannot support tournament selection (need 3)"
            )));
        }
        let pool = self.pool_size(num_rules);
        if pool == 0 {
            return Err(ConfigError::InvalidPool(format!(
                "pool_fraction {} of {num_rules} rules replaces nothing",
                self.pool_fraction
            )));
        }
        if pool > num_rules - 1 {
            return Err(ConfigError::InvalidPool(format!(
                "pool of {pool} would replace the default rule ({num_rules} rules)"
            )));
        }
        Ok(())
    }
}

/// Parameters of a classifier agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Rule population size (rule 0 is the all-wildcard default)
    pub num_rules: usize,
    /// Matches needed before a rule may forecast
    pub min_count: u64,
    /// Variance averaging horizon
    pub tauv: f64,
    /// Risk aversion (lambda) in the demand function
    pub risk_aversion: f64,
    /// Largest order in either direction
    pub max_bid: f64,
    /// Probability an initial condition bit is specified
    pub bit_prob: f64,
    /// Fraction of each coefficient range used for initial draws, centred
    pub subrange: f64,
    /// Range of `a`, the price+dividend coefficient
    pub a_range: CoefficientRange,
    /// Range of `b`, the dividend coefficient
    pub b_range: CoefficientRange,
    /// Range of `c`, the constant
    pub c_range: CoefficientRange,
    /// Starting variance of rules and the agent
    pub init_var: f64,
    /// Strength penalty per specified bit
    pub bit_cost: f64,
    /// Cap on squared forecast error; also the strength scale
    pub max_dev: f64,
    /// Floor substituted for degenerate variances
    pub min_variance: f64,
    /// Use the agent's own error variance instead of the rules'
    pub individual: bool,
    pub combination: ForecastCombination,
    pub ga: GeneticConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            num_rules: 100,
            min_count: 5,
            tauv: 75.0,
            risk_aversion: 0.5,
            max_bid: 10.0,
            bit_prob: 0.1,
            subrange: 0.5,
            a_range: CoefficientRange::new(0.7, 1.2),
            b_range: CoefficientRange::new(0.0, 0.0),
            c_range: CoefficientRange::new(-7.293691545, 21.70630846),
            init_var: 3.999769641,
            bit_cost: 0.01,
            max_dev: 100.0,
            min_variance: 1e-6,
            individual: false,
            combination: ForecastCombination::Weighted,
            ga: GeneticConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_num_rules(mut self, n: usize) -> Self {
        self.num_rules = n;
        self
    }

    pub fn with_min_count(mut self, n: u64) -> Self {
        self.min_count = n;
        self
    }

    pub fn with_ga(mut self, ga: GeneticConfig) -> Self {
        self.ga = ga;
        self
    }

    pub fn with_combination(mut self, combination: ForecastCombination) -> Self {
        self.combination = combination;
        self
    }

    pub fn with_coefficients(
        mut self,
        a: CoefficientRange,
        b: CoefficientRange,
        c: CoefficientRange,
    ) -> Self {
        self.a_range = a;
        self.b_range = b;
        self.c_range = c;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.num_rules == 0 {
            return Err(ConfigError::InvalidPopulation(
                "a classifier needs at least one rule".to_string(),
            ));
        }
        ConfigError::check_positive("classifier.tauv", self.tauv)?;
        ConfigError::check_positive("classifier.risk_aversion", self.risk_aversion)?;
        ConfigError::check_positive("classifier.max_bid", self.max_bid)?;
        ConfigError::check_positive("classifier.init_var", self.init_var)?;
        ConfigError::check_positive("classifier.max_dev", self.max_dev)?;
        ConfigError::check_positive("classifier.min_variance", self.min_variance)?;
        ConfigError::check_probability("classifier.bit_prob", self.bit_prob)?;
        ConfigError::check_probability("classifier.subrange", self.subrange)?;
        if !(self.bit_cost >= 0.0 && self.bit_cost.is_finite()) {
            return Err(ConfigError::parameter("classifier.bit_cost", "must be non-negative"));
        }
        self.a_range.validate("classifier.a_range")?;
        self.b_range.validate("classifier.b_range")?;
        self.c_range.validate("classifier.c_range")?;
        self.ga.validate(self.num_rules)
    }
}

/// Parameters of a signal-following trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTraderConfig {
    /// Order size in either direction
    pub bid_size: f64,
    /// Index into the signal vector: buy when set, sell otherwise
    pub key_bit: usize,
}

impl Default for SignalTraderConfig {
    fn default() -> Self {
        Self {
            bid_size: 1.0,
            key_bit: 0,
        }
    }
}

impl SignalTraderConfig {
    pub fn validate(&self, signal_len: usize) -> ConfigResult<()> {
        ConfigError::check_positive("signal_trader.bid_size", self.bid_size)?;
        if self.key_bit >= signal_len {
            return Err(ConfigError::InvalidBits(format!(
                "key bit {} outside a signal vector of {signal_len} bits",
                self.key_bit
            )));
        }
        Ok(())
    }
}
