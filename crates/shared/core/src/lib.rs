//! Bourse Core Domain
//!
//! Pure domain types shared by every Bourse crate: the trit-encoded rule
//! conditions and market signal vectors, rolling statistics, identifiers and
//! the structured events recorded on each step.
//! This crate contains no I/O and no randomness.

pub mod bits;
pub mod events;
pub mod stats;
pub mod values;

// Re-export commonly used types at crate root
pub use bits::{Condition, SignalBits, Trit, WORD_BITS, word_count};
pub use events::{ConstraintKind, StepEvent};
pub use stats::{Ewma, MovingAverage, MovingAverageKind, RollingMean};
pub use values::{AgentId, Price, Quantity, Time};
