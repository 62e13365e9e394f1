use serde::{Deserialize, Serialize};

use super::{Ewma, RollingMean};

/// Which flavour of average a `MovingAverage` reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverageKind {
    /// Equally weighted mean of the last `width` observations
    #[default]
    Fixed,
    /// Exponentially weighted with alpha = 1 - exp(-1/width)
    Exponential,
}

/// Moving average of configurable width
///
/// Both the window mean and the EWMA are maintained; `value()` reports the
/// configured kind. Each update is O(1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverage {
    kind: MovingAverageKind,
    window: RollingMean,
    ewma: Ewma,
}

impl MovingAverage {
    /// Average of width `width` whose history starts out filled with `initial`
    pub fn new(kind: MovingAverageKind, width: usize, initial: f64) -> Self {
        Self {
            kind,
            window: RollingMean::filled(width, initial),
            ewma: Ewma::from_width(width as f64, initial),
        }
    }

    #[inline]
    pub fn update(&mut self, value: f64) {
        self.window.push(value);
        self.ewma.update(value);
    }

    #[inline]
    pub fn value(&self) -> f64 {
        match self.kind {
            MovingAverageKind::Fixed => self.window.mean().unwrap_or_else(|| self.ewma.value()),
            MovingAverageKind::Exponential => self.ewma.value(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.window.window()
    }

    #[inline]
    pub fn kind(&self) -> MovingAverageKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_kind_reports_window_mean() {
        let mut ma = MovingAverage::new(MovingAverageKind::Fixed, 2, 0.0);
        ma.update(4.0);
        ma.update(6.0);
        assert_relative_eq!(ma.value(), 5.0);
    }

    #[test]
    fn test_exponential_kind_reports_ewma() {
        let mut ma = MovingAverage::new(MovingAverageKind::Exponential, 5, 10.0);
        ma.update(10.0);
        assert_relative_eq!(ma.value(), 10.0);
        ma.update(20.0);
        assert!(ma.value() > 10.0 && ma.value() < 20.0);
    }

    #[test]
    fn test_initial_fill() {
        let ma = MovingAverage::new(MovingAverageKind::Fixed, 500, 100.0);
        assert_eq!(ma.width(), 500);
        assert_relative_eq!(ma.value(), 100.0);
    }
}
