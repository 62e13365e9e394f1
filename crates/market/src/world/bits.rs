//! Named world bits
//!
//! The full catalogue, in the order `MarketState` computes them:
//!
//! ```text
//! on off random
//! dup dup1 ..            dividend went up now / k periods ago
//! d{w}up                 dividend MA rose
//! d>d{w}                 dividend above its MA
//! d{a}>d{b}              shorter dividend MA above longer
//! d/md>{r}               dividend / baseline above ratio
//! pr/d>{r}               price * rate / old dividend above ratio
//! pup pup1 ..            price went up now / k periods ago
//! p{w}up  p>p{w}  p{a}>p{b}
//! ```

/// Ratio thresholds with their display names
pub const RATIOS: [(f64, &str); 10] = [
    (0.25, "1/4"),
    (0.5, "1/2"),
    (0.75, "3/4"),
    (0.875, "7/8"),
    (1.0, "1"),
    (1.125, "9/8"),
    (1.25, "5/4"),
    (1.5, "3/2"),
    (2.0, "2"),
    (4.0, "4"),
];

/// Bits monitored by classifier agents unless configured otherwise
pub const DEFAULT_SIGNAL_BITS: [&str; 16] = [
    "pr/d>1/4", "pr/d>1/2", "pr/d>3/4", "pr/d>7/8", "pr/d>1", "pr/d>9/8", "pr/d>5/4",
    "pr/d>3/2", "pr/d>2", "pr/d>4", "p>p5", "p>p20", "p>p100", "p>p500", "on", "off",
];

fn updown_names(prefix: &str, lookback: usize) -> impl Iterator<Item = String> + '_ {
    (0..lookback).map(move |k| {
        if k == 0 {
            format!("{prefix}up")
        } else {
            format!("{prefix}up{k}")
        }
    })
}

fn series_names(prefix: &str, widths: &[usize]) -> Vec<String> {
    let mut names: Vec<String> = widths.iter().map(|w| format!("{prefix}{w}up")).collect();
    names.extend(widths.iter().map(|w| format!("{prefix}>{prefix}{w}")));
    for (j, a) in widths.iter().enumerate() {
        for b in &widths[j + 1..] {
            names.push(format!("{prefix}{a}>{prefix}{b}"));
        }
    }
    names
}

/// Every world bit name for the given lookback and MA widths
pub fn world_bit_names(lookback: usize, widths: &[usize]) -> Vec<String> {
    let mut names = vec!["on".to_string(), "off".to_string(), "random".to_string()];
    names.extend(updown_names("d", lookback));
    names.extend(series_names("d", widths));
    names.extend(RATIOS.iter().map(|(_, r)| format!("d/md>{r}")));
    names.extend(RATIOS.iter().map(|(_, r)| format!("pr/d>{r}")));
    names.extend(updown_names("p", lookback));
    names.extend(series_names("p", widths));
    names
}

/// Index of the first price up/down bit ("pup")
pub fn price_updown_offset(lookback: usize, widths: &[usize]) -> usize {
    let pairs = widths.len() * widths.len().saturating_sub(1) / 2;
    3 + lookback + 2 * widths.len() + pairs + 2 * RATIOS.len()
}
