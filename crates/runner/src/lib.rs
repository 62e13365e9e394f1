//! Bourse Runner - Artificial Stock Market Simulation
//!
//! Wires the dividend process, the world state, the specialist and the
//! trader population into a single seeded simulation:
//!
//! - **Config**: JSON-loadable parameters, validated once before a run
//! - **Simulation**: warm-up, the per-period step and read-only queries
//!
//! ## One period
//!
//! ```text
//!   ┌──────────────────┐
//!   │ Dividend Process │ d(t)
//!   └────────┬─────────┘
//!            ▼
//!   ┌──────────────────┐  earnings   ┌─────────────────────────────┐
//!   │   Market State   │────────────►│          TRADERS            │
//!   │ (history, bits)  │  signals    │  classifier │ signal-follow │
//!   └────────▲─────────┘────────────►└──────┬──────────────▲───────┘
//!            │                              │ demand(p)    │ fills
//!            │ p(t)                         ▼              │
//!            │                    ┌──────────────────┐     │
//!            └────────────────────│    Specialist    │─────┘
//!                                 │ (tâtonnement +   │
//!                                 │  pro-rata fill)  │
//!                                 └──────────────────┘
//!            then: performance update, periodic genetic algorithm
//! ```

pub mod config;
pub mod simulation;

pub use config::{
    AgentsConfig, LoadError, SimulationConfig, load_config, load_config_from_str,
    load_default_config,
};
pub use simulation::{AgentSnapshot, RunSummary, Simulation, StepResult};
