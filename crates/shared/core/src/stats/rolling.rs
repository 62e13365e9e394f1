//! Fixed-window arithmetic mean

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Arithmetic mean over the last `window` observations
///
/// Keeps a running sum so each push is O(1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingMean {
    values: VecDeque<f64>,
    window: usize,
    sum: f64,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            values: VecDeque::with_capacity(window),
            window,
            sum: 0.0,
        }
    }

    /// Window pre-filled with `value`
    pub fn filled(window: usize, value: f64) -> Self {
        let mut rolling = Self::new(window);
        for _ in 0..rolling.window {
            rolling.push(value);
        }
        rolling
    }

    #[inline]
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.window {
            if let Some(removed) = self.values.pop_front() {
                self.sum -= removed;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    /// Mean of the values currently held, `None` when empty
    #[inline]
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }
}
