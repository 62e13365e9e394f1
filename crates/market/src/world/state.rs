use bourse_core::{MovingAverage, Price, SignalBits, Time};
use bourse_ports::{ConfigResult, MarketView};
use rand::Rng;
use std::collections::VecDeque;

use super::WorldConfig;
use super::bits::{RATIOS, price_updown_offset, world_bit_names};
use super::history::History;

/// Price and dividend series with their derived averages
#[derive(Debug, Clone)]
struct Series {
    history: History,
    ups: VecDeque<bool>,
    ma: Vec<MovingAverage>,
    /// Averages fed with the series lagged by each average's own width
    lagged_ma: Vec<MovingAverage>,
}

impl Series {
    fn new(config: &WorldConfig, initial: f64) -> Self {
        let make = || {
            config
                .ma_widths
                .iter()
                .map(|&w| MovingAverage::new(config.moving_average, w, initial))
                .collect::<Vec<_>>()
        };
        Self {
            history: History::filled(config.history_length, initial),
            ups: std::iter::repeat_n(false, config.updown_lookback).collect(),
            ma: make(),
            lagged_ma: make(),
        }
    }

    fn record(&mut self, value: f64, went_up: bool) {
        self.ups.pop_back();
        self.ups.push_front(went_up);

        for (ma, lagged) in self.ma.iter_mut().zip(self.lagged_ma.iter_mut()) {
            let lag = self.history.ago(ma.width() - 1);
            ma.update(value);
            lagged.update(lag);
        }
        self.history.push(value);
    }

    /// up/down flags, MA-rose flags, level-above-MA flags, MA-pair flags
    fn push_bits(&self, level: f64, out: &mut Vec<bool>) {
        out.extend(self.ups.iter().copied());
        out.extend(
            self.ma
                .iter()
                .zip(&self.lagged_ma)
                .map(|(ma, lagged)| ma.value() > lagged.value()),
        );
        out.extend(self.ma.iter().map(|ma| level > ma.value()));
        for (j, a) in self.ma.iter().enumerate() {
            for b in &self.ma[j + 1..] {
                out.push(a.value() > b.value());
            }
        }
    }
}

/// The market "world": current and past prices and dividends plus the
/// encoded signal bits derived from them
///
/// Written only by the market itself, once per period after settlement;
/// traders see it through [`MarketView`].
#[derive(Debug, Clone)]
pub struct MarketState {
    interest_rate: f64,
    dividend_scale: f64,
    time: Time,

    price: Price,
    old_price: Price,
    dividend: f64,
    old_dividend: f64,
    profit_per_unit: f64,
    return_ratio: f64,
    risk_neutral: f64,

    prices: Series,
    dividends: Series,

    bit_names: Vec<String>,
    world: SignalBits,
    pup_offset: usize,
    lookback: usize,

    /// World bit index of each signal bit
    projection: Vec<usize>,
    signals: SignalBits,
}

impl MarketState {
    /// World at rest: dividend at `baseline`, price at the risk-neutral
    /// value `baseline / interest_rate`, histories and averages filled
    /// with those values.
    pub fn new(config: &WorldConfig, baseline: f64) -> ConfigResult<Self> {
        config.validate()?;

        let price = baseline / config.interest_rate;
        let bit_names = world_bit_names(config.updown_lookback, &config.ma_widths);
        let projection = config
            .signal_bits
            .iter()
            .filter_map(|name| bit_names.iter().position(|n| n == name))
            .collect::<Vec<_>>();

        let mut state = Self {
            interest_rate: config.interest_rate,
            dividend_scale: baseline,
            time: 0,
            price,
            old_price: price,
            dividend: baseline,
            old_dividend: baseline,
            profit_per_unit: 0.0,
            return_ratio: 0.0,
            risk_neutral: price,
            prices: Series::new(config, price),
            dividends: Series::new(config, baseline),
            world: SignalBits::new(bit_names.len()),
            pup_offset: price_updown_offset(config.updown_lookback, &config.ma_widths),
            lookback: config.updown_lookback,
            bit_names,
            signals: SignalBits::new(projection.len()),
            projection,
        };
        state.make_bits(false);
        Ok(state)
    }

    pub fn set_time(&mut self, time: Time) {
        self.time = time;
    }

    /// Announce this period's dividend
    pub fn set_dividend(&mut self, dividend: f64) {
        self.old_dividend = self.dividend;
        self.dividend = dividend;
        self.risk_neutral = dividend / self.interest_rate;
    }

    /// Record the settled price
    pub fn set_price(&mut self, price: Price) {
        self.old_price = self.price;
        self.price = price;
        self.profit_per_unit = self.price - self.old_price + self.dividend;
        self.return_ratio = if self.old_price <= 0.0 {
            self.profit_per_unit * 1000.0
        } else {
            self.profit_per_unit / self.old_price
        };
    }

    /// Fold the current price and dividend into the histories and
    /// averages, then recompute every world bit. Draws one random bit.
    pub fn update<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.prices.record(self.price, self.price > self.old_price);
        self.dividends
            .record(self.dividend, self.dividend > self.old_dividend);
        let random_bit = rng.gen_bool(0.5);
        self.make_bits(random_bit);
    }

    fn make_bits(&mut self, random_bit: bool) {
        let mut bits = Vec::with_capacity(self.bit_names.len());
        bits.extend([true, false, random_bit]);

        self.dividends.push_bits(self.dividend, &mut bits);

        let multiple = self.dividend / self.dividend_scale;
        bits.extend(RATIOS.iter().map(|(r, _)| multiple > *r));

        // Compare with the previous dividend, which the current price was set against
        let multiple = self.price * self.interest_rate / self.old_dividend;
        bits.extend(RATIOS.iter().map(|(r, _)| multiple > *r));

        self.prices.push_bits(self.price, &mut bits);

        debug_assert_eq!(bits.len(), self.bit_names.len());
        self.world = SignalBits::from_bools(&bits);

        for (i, &w) in self.projection.iter().enumerate() {
            self.signals.set(i, self.world.get(w));
        }
    }

    pub fn old_price(&self) -> Price {
        self.old_price
    }

    pub fn old_dividend(&self) -> f64 {
        self.old_dividend
    }

    pub fn return_ratio(&self) -> f64 {
        self.return_ratio
    }

    /// `dividend / interest_rate`
    pub fn risk_neutral_price(&self) -> Price {
        self.risk_neutral
    }

    /// Every world bit, in catalogue order
    pub fn world_bits(&self) -> &SignalBits {
        &self.world
    }

    pub fn bit_names(&self) -> &[String] {
        &self.bit_names
    }

    /// Current value of a named world bit
    pub fn bit(&self, name: &str) -> Option<bool> {
        self.bit_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.world.get(i))
    }

    /// Current values of the price moving averages, shortest first
    pub fn price_averages(&self) -> Vec<f64> {
        self.prices.ma.iter().map(|ma| ma.value()).collect()
    }

    pub fn dividend_averages(&self) -> Vec<f64> {
        self.dividends.ma.iter().map(|ma| ma.value()).collect()
    }

    /// Price history, newest first
    pub fn price_history(&self) -> Vec<Price> {
        self.prices.history.iter().collect()
    }

    pub fn dividend_history(&self) -> Vec<f64> {
        self.dividends.history.iter().collect()
    }

    /// +1 if the price rose in each of the last `n` updates, -1 if it fell
    /// in each, 0 otherwise. `n` is capped at the up/down lookback.
    pub fn price_trend(&self, n: usize) -> i32 {
        let n = n.min(self.lookback);
        if n == 0 {
            return 0;
        }
        let ups = (0..n).map(|k| self.world.get(self.pup_offset + k));
        let (mut any_up, mut any_down) = (false, false);
        for up in ups {
            any_up |= up;
            any_down |= !up;
        }
        match (any_up, any_down) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        }
    }
}

impl MarketView for MarketState {
    fn time(&self) -> Time {
        self.time
    }

    fn price(&self) -> Price {
        self.price
    }

    fn dividend(&self) -> f64 {
        self.dividend
    }

    fn interest_rate(&self) -> f64 {
        self.interest_rate
    }

    fn profit_per_unit(&self) -> f64 {
        self.profit_per_unit
    }

    fn signals(&self) -> &SignalBits {
        &self.signals
    }
}
