use bourse_core::{Price, SignalBits, Time};

/// Read-only view of the market state handed to traders
///
/// Frozen for the duration of a step phase: traders read it, only the
/// market itself writes it.
pub trait MarketView {
    /// Current period
    fn time(&self) -> Time;

    /// Last realized price
    fn price(&self) -> Price;

    /// Dividend announced for the current period
    fn dividend(&self) -> f64;

    /// Risk-free rate per period
    fn interest_rate(&self) -> f64;

    /// `price - old_price + dividend` for the last settlement
    fn profit_per_unit(&self) -> f64;

    /// Projected signal vector every rule condition is matched against
    fn signals(&self) -> &SignalBits;
}
