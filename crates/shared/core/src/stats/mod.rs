//! Statistics Module
//!
//! Streaming averages used by the market state:
//! - Fixed-window arithmetic mean with a running sum
//! - Exponentially weighted moving average
//! - `MovingAverage`, which tracks both and reports the configured kind

mod ema;
mod moving_average;
mod rolling;

pub use ema::Ewma;
pub use moving_average::{MovingAverage, MovingAverageKind};
pub use rolling::RollingMean;
