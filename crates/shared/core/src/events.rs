//! Step Events
//!
//! Recoverable anomalies and notable occurrences of a single period. They are
//! collected on the step result instead of being raised, so a long batch run
//! keeps going while the anomalies stay inspectable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::values::{AgentId, Price, Quantity, Time};

/// Constraint that limited an agent's demand or settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Order exceeded the maximum bid/offer size
    MaxBid,
    /// Purchase would take cash below the floor
    MinCash,
    /// Sale would take the position below the floor
    MinHolding,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::MaxBid => write!(f, "max-bid"),
            ConstraintKind::MinCash => write!(f, "min-cash"),
            ConstraintKind::MinHolding => write!(f, "min-holding"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StepEvent {
    /// Iteration cap reached with excess demand still above tolerance
    ConvergenceFailure {
        iterations: usize,
        excess: Quantity,
        price: Price,
    },
    /// Price search hit the configured bounds
    PriceClamped { requested: Price, clamped: Price },
    /// Raw dividend fell outside `[min, max]`
    DividendClamped { raw: f64, clamped: f64 },
    /// Final demand was reduced by a holding or cash constraint
    DemandConstrained {
        agent: AgentId,
        kind: ConstraintKind,
        requested: Quantity,
        allowed: Quantity,
    },
    /// Cash would have dropped below the floor and was clamped
    CashFloored {
        agent: AgentId,
        requested: f64,
        floor: f64,
    },
    /// A zero or tiny variance was replaced by the configured floor
    VarianceFloored { agent: AgentId, variance: f64 },
    /// A genetic algorithm generation ran
    GeneticRun {
        agent: AgentId,
        time: Time,
        replaced: usize,
    },
}

impl StepEvent {
    /// Whether the event describes an anomaly rather than normal activity
    pub fn is_anomaly(&self) -> bool {
        !matches!(self, StepEvent::GeneticRun { .. })
    }

    /// Agent the event is about, if any
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            StepEvent::DemandConstrained { agent, .. }
            | StepEvent::CashFloored { agent, .. }
            | StepEvent::VarianceFloored { agent, .. }
            | StepEvent::GeneticRun { agent, .. } => Some(*agent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_agent() {
        let ev = StepEvent::VarianceFloored {
            agent: AgentId(3),
            variance: 0.0,
        };
        assert_eq!(ev.agent(), Some(AgentId(3)));
        assert!(ev.is_anomaly());

        let ev = StepEvent::ConvergenceFailure {
            iterations: 10,
            excess: 2.0,
            price: 99.0,
        };
        assert_eq!(ev.agent(), None);
    }

    #[test]
    fn test_genetic_run_is_not_anomaly() {
        let ev = StepEvent::GeneticRun {
            agent: AgentId(0),
            time: 250,
            replaced: 10,
        };
        assert!(!ev.is_anomaly());
    }
}
