//! Simulation Configuration
//!
//! Every parameter of a run in one serde tree. Missing fields take their
//! defaults, so a JSON file only needs the overrides.

use std::path::Path;

use bourse_agents::{AccountConfig, ClassifierConfig, SignalTraderConfig};
use bourse_market::{DividendConfig, SpecialistConfig, WorldConfig};
use bourse_ports::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigError),
}

/// Trader population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Number of classifier agents
    pub classifiers: usize,
    /// Number of signal-following traders, created after the classifiers
    pub signal_traders: usize,
    pub classifier: ClassifierConfig,
    pub account: AccountConfig,
    pub signal: SignalTraderConfig,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            classifiers: 25,
            signal_traders: 0,
            classifier: ClassifierConfig::default(),
            account: AccountConfig::default(),
            signal: SignalTraderConfig::default(),
        }
    }
}

impl AgentsConfig {
    pub fn population(&self) -> usize {
        self.classifiers + self.signal_traders
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of the single random stream behind every draw
    pub seed: u64,
    /// Periods of prehistory run before the first step
    pub warmup_steps: u64,
    pub dividend: DividendConfig,
    pub world: WorldConfig,
    pub specialist: SpecialistConfig,
    pub agents: AgentsConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            warmup_steps: 501,
            dividend: DividendConfig::default(),
            world: WorldConfig::default(),
            specialist: SpecialistConfig::default(),
            agents: AgentsConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_warmup(mut self, steps: u64) -> Self {
        self.warmup_steps = steps;
        self
    }

    pub fn with_dividend(mut self, dividend: DividendConfig) -> Self {
        self.dividend = dividend;
        self
    }

    pub fn with_world(mut self, world: WorldConfig) -> Self {
        self.world = world;
        self
    }

    pub fn with_specialist(mut self, specialist: SpecialistConfig) -> Self {
        self.specialist = specialist;
        self
    }

    pub fn with_agents(mut self, agents: AgentsConfig) -> Self {
        self.agents = agents;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.agents.population() == 0 {
            return Err(ConfigError::InvalidPopulation(
                "at least one trader is required".to_string(),
            ));
        }
        self.dividend.validate()?;
        self.world.validate()?;
        self.specialist.validate()?;
        self.agents.account.validate()?;
        if self.agents.classifiers > 0 {
            self.agents.classifier.validate()?;
        }
        if self.agents.signal_traders > 0 {
            self.agents.signal.validate(self.world.signal_len())?;
        }
        Ok(())
    }
}

/// Load and validate a simulation configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig, LoadError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load and validate a configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<SimulationConfig, LoadError> {
    let config: SimulationConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<SimulationConfig, LoadError> {
    let default_config = include_str!("default_config.json");
    load_config_from_str(default_config)
}
