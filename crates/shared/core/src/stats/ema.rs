//! Exponentially weighted moving average

use serde::{Deserialize, Serialize};

/// EWMA over `f64` observations
///
/// new = (1 - alpha) * old + alpha * value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ewma {
    value: f64,
    alpha: f64,
}

impl Ewma {
    /// EWMA whose weights decay with characteristic width `width`
    /// (alpha = 1 - exp(-1/width)), starting at `initial`
    pub fn from_width(width: f64, initial: f64) -> Self {
        let alpha = if width > 0.0 { -(-1.0 / width).exp_m1() } else { 1.0 };
        Self::with_alpha(alpha, initial)
    }

    /// EWMA with an explicit weight on new observations
    pub fn with_alpha(alpha: f64, initial: f64) -> Self {
        Self {
            value: initial,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    #[inline]
    pub fn update(&mut self, value: f64) {
        self.value += self.alpha * (value - self.value);
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Overwrite the current value
    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ewma_constant_input() {
        let mut ema = Ewma::from_width(20.0, 5.0);
        for _ in 0..100 {
            ema.update(5.0);
        }
        assert_relative_eq!(ema.value(), 5.0);
    }

    #[test]
    fn test_ewma_alpha_from_width() {
        let ema = Ewma::from_width(1.0, 0.0);
        assert_relative_eq!(ema.alpha(), 1.0 - (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_ewma_step() {
        let mut ema = Ewma::with_alpha(0.5, 0.0);
        ema.update(10.0);
        assert_relative_eq!(ema.value(), 5.0);
        ema.update(10.0);
        assert_relative_eq!(ema.value(), 7.5);
    }

    #[test]
    fn test_ewma_converges_toward_new_level() {
        let mut ema = Ewma::from_width(5.0, 0.0);
        for _ in 0..200 {
            ema.update(100.0);
        }
        assert_relative_eq!(ema.value(), 100.0, epsilon = 1e-6);
    }
}
