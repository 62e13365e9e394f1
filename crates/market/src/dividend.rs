//! Dividend Process
//!
//! Mean-reverting AR(1) dividend around a baseline:
//!
//! ```text
//! d' = baseline + rho * (d - baseline) + gauss * N(0, 1)
//! rho   = exp(-1 / period)
//! gauss = baseline * amplitude * sqrt(1 - rho^2)
//! ```
//!
//! so the stationary standard deviation is `baseline * amplitude`. Draws are
//! clamped to `[min_dividend, max_dividend]`.

use bourse_ports::{ConfigError, ConfigResult};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Parameters of the dividend process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DividendConfig {
    /// Long-run mean dividend
    pub baseline: f64,
    /// Stationary standard deviation as a fraction of `baseline`, in [0, 1]
    pub amplitude: f64,
    /// Autocorrelation time in periods (at least 2)
    pub period: f64,
    /// Floor on any draw
    pub min_dividend: f64,
    /// Ceiling on any draw
    pub max_dividend: f64,
}

impl Default for DividendConfig {
    fn default() -> Self {
        Self {
            baseline: 10.0,
            amplitude: 0.02727,
            period: 19.5,
            min_dividend: 0.00005,
            max_dividend: 100.0,
        }
    }
}

impl DividendConfig {
    /// Constant dividend at `level`
    pub fn fixed(level: f64) -> Self {
        Self {
            baseline: level,
            amplitude: 0.0,
            ..Default::default()
        }
    }

    pub fn with_baseline(mut self, baseline: f64) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    pub fn with_bounds(mut self, min_dividend: f64, max_dividend: f64) -> Self {
        self.min_dividend = min_dividend;
        self.max_dividend = max_dividend;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        ConfigError::check_positive("dividend.baseline", self.baseline)?;
        ConfigError::check_positive("dividend.min_dividend", self.min_dividend)?;
        if !self.amplitude.is_finite() {
            return Err(ConfigError::parameter("dividend.amplitude", "must be finite"));
        }
        if !self.period.is_finite() {
            return Err(ConfigError::parameter("dividend.period", "must be finite"));
        }
        if !(self.max_dividend > self.min_dividend) {
            return Err(ConfigError::parameter(
                "dividend.max_dividend",
                format!("{} must exceed min_dividend {}", self.max_dividend, self.min_dividend),
            ));
        }
        if self.baseline < self.min_dividend || self.baseline > self.max_dividend {
            return Err(ConfigError::parameter(
                "dividend.baseline",
                "must lie within [min_dividend, max_dividend]",
            ));
        }
        Ok(())
    }
}

/// One dividend draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividendDraw {
    pub dividend: f64,
    /// Raw value before clamping, when the clamp was applied
    pub clamped_from: Option<f64>,
}

/// Truncate to 4 decimals
fn truncate4(x: f64) -> f64 {
    0.0001 * (10000.0 * x).trunc()
}

#[derive(Debug, Clone)]
pub struct DividendProcess {
    baseline: f64,
    amplitude: f64,
    period: f64,
    rho: f64,
    gauss: f64,
    min_dividend: f64,
    max_dividend: f64,
    dividend: f64,
}

impl DividendProcess {
    /// Process starting at the baseline.
    ///
    /// `amplitude` is clamped to [0, 1] and `period` floored at 2.
    pub fn new(config: &DividendConfig) -> ConfigResult<Self> {
        config.validate()?;

        let amplitude = truncate4(config.amplitude.clamp(0.0, 1.0));
        let period = config.period.max(2.0);
        let rho = truncate4((-1.0 / period).exp());
        let gauss = config.baseline * amplitude * (1.0 - rho * rho).sqrt();

        Ok(Self {
            baseline: config.baseline,
            amplitude,
            period,
            rho,
            gauss,
            min_dividend: config.min_dividend,
            max_dividend: config.max_dividend,
            dividend: config.baseline,
        })
    }

    /// Advance one period. Always consumes exactly one normal draw.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> DividendDraw {
        let shock: f64 = rng.sample(StandardNormal);
        let raw = self.baseline + self.rho * (self.dividend - self.baseline) + self.gauss * shock;
        let dividend = raw.clamp(self.min_dividend, self.max_dividend);
        self.dividend = dividend;

        DividendDraw {
            dividend,
            clamped_from: (dividend != raw).then_some(raw),
        }
    }

    #[inline]
    pub fn dividend(&self) -> f64 {
        self.dividend
    }

    #[inline]
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    #[inline]
    pub fn period(&self) -> f64 {
        self.period
    }

    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Standard deviation of the per-period shock
    #[inline]
    pub fn shock_scale(&self) -> f64 {
        self.gauss
    }
}
