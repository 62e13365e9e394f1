//! Bourse Market
//!
//! Everything on the market side of a period:
//! - `DividendProcess`: bounded AR(1) dividend
//! - `MarketState`: price/dividend history, moving averages, signal bits
//! - `Specialist`: tâtonnement search for the clearing price
//! - `settlement`: pro-rata rationing of the cleared volume

pub mod dividend;
pub mod settlement;
pub mod specialist;
pub mod world;

pub use dividend::{DividendConfig, DividendDraw, DividendProcess};
pub use settlement::{Settlement, settle_trades};
pub use specialist::{Clearing, Specialist, SpecialistConfig, SpecialistType};
pub use world::{MarketState, WorldConfig};
