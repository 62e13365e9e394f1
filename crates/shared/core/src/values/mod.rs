use serde::{Deserialize, Serialize};
use std::fmt;

/// Price of the risky asset
pub type Price = f64;

/// Units of the risky asset (negative for short positions)
pub type Quantity = f64;

/// Simulated period counter
pub type Time = u64;

/// Identifier of a trader, stable for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}
