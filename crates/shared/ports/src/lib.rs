//! Bourse Ports
//!
//! Port definitions (traits) for the Bourse market core.
//! These define the boundaries between the market (world state, specialist)
//! and the traders that populate it.

mod error;
mod market;
mod trader;

pub use error::{ConfigError, ConfigResult};
pub use market::MarketView;
pub use trader::{DemandQuote, Fill, Holdings, RuleStats, Summary, Trader};
