//! Bourse Agents
//!
//! Trader implementations behind the `Trader` port:
//! - `ClassifierAgent`: condition/forecast rules, strength-weighted
//!   forecasting, genetic rule evolution
//! - `SignalTrader`: fixed-size orders keyed on one signal bit
//! - `TraderKind`: tagged union of the above, chosen by configuration

pub mod account;
pub mod classifier;
pub mod config;
pub mod rule;
pub mod signal;

mod kind;

pub use account::Account;
pub use classifier::ClassifierAgent;
pub use config::{
    AccountConfig, ClassifierConfig, CoefficientRange, ForecastCombination, GeneticConfig,
    SignalTraderConfig,
};
pub use kind::TraderKind;
pub use rule::Rule;
pub use signal::SignalTrader;
