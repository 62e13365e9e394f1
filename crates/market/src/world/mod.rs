//! World State
//!
//! The shared market state every trader conditions on: price/dividend
//! history, moving averages, and the named signal bits derived from them.
//!
//! Components:
//! - `WorldConfig`: widths, lookback, interest rate, monitored bits
//! - `bits`: the catalogue of named world bits
//! - `MarketState`: the state itself, updated once per period

pub mod bits;
mod history;
mod state;

pub use state::MarketState;

use bourse_core::MovingAverageKind;
use bourse_ports::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration of the world state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Risk-free rate per period
    pub interest_rate: f64,
    /// Length of the circular price/dividend history
    pub history_length: usize,
    /// Widths of the price and dividend moving averages, shortest first
    pub ma_widths: Vec<usize>,
    /// Fixed-window or exponential averages
    pub moving_average: MovingAverageKind,
    /// Periods of up/down flags kept for price and dividend
    pub updown_lookback: usize,
    /// Named world bits projected into the agents' signal vector
    pub signal_bits: Vec<String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            interest_rate: 0.1,
            history_length: 500,
            ma_widths: vec![5, 20, 100, 500],
            moving_average: MovingAverageKind::Fixed,
            updown_lookback: 5,
            signal_bits: bits::DEFAULT_SIGNAL_BITS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl WorldConfig {
    pub fn with_interest_rate(mut self, rate: f64) -> Self {
        self.interest_rate = rate;
        self
    }

    pub fn with_moving_average(mut self, kind: MovingAverageKind) -> Self {
        self.moving_average = kind;
        self
    }

    pub fn with_ma_widths(mut self, widths: Vec<usize>) -> Self {
        self.ma_widths = widths;
        self
    }

    pub fn with_history_length(mut self, len: usize) -> Self {
        self.history_length = len;
        self
    }

    pub fn with_signal_bits<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.signal_bits = names.into_iter().map(Into::into).collect();
        self
    }

    /// Names of every world bit this configuration produces, in order
    pub fn world_bit_names(&self) -> Vec<String> {
        bits::world_bit_names(self.updown_lookback, &self.ma_widths)
    }

    /// Number of bits in the agents' signal vector
    pub fn signal_len(&self) -> usize {
        self.signal_bits.len()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigError::check_positive("world.interest_rate", self.interest_rate)?;

        if self.updown_lookback == 0 {
            return Err(ConfigError::parameter("world.updown_lookback", "must be at least 1"));
        }
        if self.ma_widths.is_empty() || self.ma_widths.contains(&0) {
            return Err(ConfigError::parameter(
                "world.ma_widths",
                "need at least one width, all positive",
            ));
        }
        let longest = self.ma_widths.iter().copied().max().unwrap_or(1);
        if self.history_length < longest {
            return Err(ConfigError::parameter(
                "world.history_length",
                format!("{} is shorter than the longest average {}", self.history_length, longest),
            ));
        }

        if self.signal_bits.is_empty() {
            return Err(ConfigError::InvalidBits("no signal bits configured".to_string()));
        }
        let known: HashSet<String> = self.world_bit_names().into_iter().collect();
        let mut seen = HashSet::new();
        for name in &self.signal_bits {
            if !known.contains(name) {
                return Err(ConfigError::UnknownBit(name.clone()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::InvalidBits(format!("{name} listed twice")));
            }
        }
        Ok(())
    }
}
