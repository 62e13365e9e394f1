//! Simulation - the per-period step loop
//!
//! Owns every component and the single random stream. Each `advance` runs
//! one period:
//!
//! 1. draw the dividend and announce it
//! 2. credit earnings to every trader
//! 3. fold the period into the world state and recompute the signal bits
//! 4. traders match conditions and fix their forecasts
//! 5. the specialist clears; the world records the price
//! 6. pro-rata settlement
//! 7. traders update performance
//! 8. due genetic algorithm generations
//!
//! Anomalies never abort a step; they are collected on the `StepResult`.

use bourse_agents::{ClassifierAgent, SignalTrader, TraderKind};
use bourse_core::{AgentId, Price, Quantity, StepEvent, Time};
use bourse_market::{DividendProcess, MarketState, Specialist, settle_trades};
use bourse_ports::{ConfigResult, Holdings, MarketView, RuleStats, Trader};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;

/// Outcome of one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub time: Time,
    pub price: Price,
    pub dividend: f64,
    pub volume: Quantity,
    /// Demand evaluations the specialist needed
    pub iterations: usize,
    pub converged: bool,
    pub events: Vec<StepEvent>,
}

impl StepResult {
    pub fn anomalies(&self) -> impl Iterator<Item = &StepEvent> {
        self.events.iter().filter(|e| e.is_anomaly())
    }
}

/// Read-only view of one trader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub kind: String,
    pub holdings: Holdings,
}

/// Aggregates over a batch of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: u64,
    pub mean_price: f64,
    /// Standard deviation of the one-period price returns
    pub return_volatility: f64,
    pub total_volume: Quantity,
    pub convergence_failures: u64,
    pub anomalies: u64,
    pub generations: u64,
}

pub struct Simulation {
    config: SimulationConfig,
    rng: StdRng,
    dividend: DividendProcess,
    world: MarketState,
    specialist: Specialist,
    traders: Vec<TraderKind>,
    time: Time,
    volume: Quantity,
    last: Option<StepResult>,
}

impl Simulation {
    /// Validate `config`, run the warm-up and create the traders.
    ///
    /// Configuration problems are the only fatal errors a simulation has.
    pub fn new(config: SimulationConfig) -> ConfigResult<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut dividend = DividendProcess::new(&config.dividend)?;
        let mut world = MarketState::new(&config.world, dividend.baseline())?;
        let specialist = Specialist::new(config.specialist.clone())?;

        for _ in 0..config.warmup_steps {
            let draw = dividend.next(&mut rng);
            world.set_dividend(draw.dividend);
            world.update(&mut rng);
            world.set_price(world.risk_neutral_price());
        }
        debug!(
            "warm-up of {} periods done: price {:.4}, dividend {:.4}",
            config.warmup_steps,
            world.price(),
            dividend.dividend()
        );

        let signal_len = config.world.signal_len();
        let agents = &config.agents;
        let mut traders = Vec::with_capacity(agents.population());
        for k in 0..agents.classifiers {
            let agent = ClassifierAgent::new(
                AgentId(k as u32),
                agents.classifier.clone(),
                &agents.account,
                signal_len,
                &world,
                &mut rng,
            )?;
            traders.push(TraderKind::from(agent));
        }
        for k in 0..agents.signal_traders {
            let id = AgentId((agents.classifiers + k) as u32);
            let price = world.price();
            let trader = SignalTrader::new(id, agents.signal.clone(), &agents.account, price);
            traders.push(TraderKind::from(trader));
        }

        info!(
            "simulation ready: seed {}, {} classifiers, {} signal traders",
            config.seed, agents.classifiers, agents.signal_traders
        );

        Ok(Self {
            config,
            rng,
            dividend,
            world,
            specialist,
            traders,
            time: 0,
            volume: 0.0,
            last: None,
        })
    }

    /// Run one period
    pub fn advance(&mut self) -> StepResult {
        let time = self.time;
        let mut events = Vec::new();
        self.world.set_time(time);

        let draw = self.dividend.next(&mut self.rng);
        if let Some(raw) = draw.clamped_from {
            events.push(StepEvent::DividendClamped {
                raw,
                clamped: draw.dividend,
            });
        }
        self.world.set_dividend(draw.dividend);

        for trader in &mut self.traders {
            trader.credit_earnings(&self.world, &mut events);
        }

        self.world.update(&mut self.rng);

        for trader in &mut self.traders {
            trader.match_conditions(&self.world, &mut events);
        }

        let clearing = self.specialist.clear(&self.traders, &self.world, &mut events);
        self.world.set_price(clearing.price);

        let settlement = settle_trades(&mut self.traders, clearing.price, &self.world, &mut events);
        self.volume = settlement.volume;

        for trader in &mut self.traders {
            trader.update_performance(&self.world, &mut events);
        }
        for trader in &mut self.traders {
            trader.run_evolution(time, &mut self.rng, &mut events);
        }

        let anomalies = events.iter().filter(|e| e.is_anomaly()).count();
        if anomalies > 0 {
            warn!("t={time}: {anomalies} anomalies recorded");
        }
        debug!(
            "t={time}: price {:.4} dividend {:.4} volume {:.4} ({} iterations)",
            clearing.price, draw.dividend, settlement.volume, clearing.iterations
        );

        self.time += 1;
        let result = StepResult {
            time,
            price: clearing.price,
            dividend: draw.dividend,
            volume: settlement.volume,
            iterations: clearing.iterations,
            converged: clearing.converged,
            events,
        };
        self.last = Some(result.clone());
        result
    }

    /// Run `steps` periods and summarize them
    pub fn run(&mut self, steps: u64) -> RunSummary {
        let mut summary = RunSummary {
            steps,
            ..Default::default()
        };
        let mut previous = self.price();
        let mut price_sum = 0.0;
        let mut returns = Vec::with_capacity(steps as usize);

        for _ in 0..steps {
            let step = self.advance();
            price_sum += step.price;
            if previous > 0.0 {
                returns.push(step.price / previous - 1.0);
            }
            previous = step.price;
            summary.total_volume += step.volume;
            for event in &step.events {
                match event {
                    StepEvent::ConvergenceFailure { .. } => summary.convergence_failures += 1,
                    StepEvent::GeneticRun { .. } => summary.generations += 1,
                    _ => {}
                }
                if event.is_anomaly() {
                    summary.anomalies += 1;
                }
            }
        }

        if steps > 0 {
            summary.mean_price = price_sum / steps as f64;
        }
        if returns.len() > 1 {
            let n = returns.len() as f64;
            let mean = returns.iter().sum::<f64>() / n;
            let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
            summary.return_volatility = var.sqrt();
        }
        summary
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Next period to run
    #[inline]
    pub fn time(&self) -> Time {
        self.time
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.world.price()
    }

    #[inline]
    pub fn dividend(&self) -> f64 {
        self.world.dividend()
    }

    /// Volume of the last settlement
    #[inline]
    pub fn volume(&self) -> Quantity {
        self.volume
    }

    pub fn last_step(&self) -> Option<&StepResult> {
        self.last.as_ref()
    }

    pub fn market(&self) -> &MarketState {
        &self.world
    }

    pub fn specialist(&self) -> &Specialist {
        &self.specialist
    }

    pub fn traders(&self) -> &[TraderKind] {
        &self.traders
    }

    pub fn agents(&self) -> Vec<AgentSnapshot> {
        self.traders
            .iter()
            .map(|t| AgentSnapshot {
                id: t.id(),
                kind: t.kind().to_string(),
                holdings: t.holdings(),
            })
            .collect()
    }

    fn trader(&self, id: AgentId) -> Option<&TraderKind> {
        self.traders.get(id.index()).filter(|t| t.id() == id)
    }

    pub fn holdings(&self, id: AgentId) -> Option<Holdings> {
        self.trader(id).map(|t| t.holdings())
    }

    pub fn rule_stats(&self, id: AgentId) -> Option<RuleStats> {
        self.trader(id)?.rule_stats()
    }

    pub fn last_ga_time(&self, id: AgentId) -> Option<Time> {
        self.trader(id)?.last_ga_time()
    }

    /// Current value of a named world bit
    pub fn world_bit(&self, name: &str) -> Option<bool> {
        self.world.bit(name)
    }

    /// Net up (+1) and down (-1) price moves over the last `n` periods
    pub fn price_trend(&self, n: usize) -> i32 {
        self.world.price_trend(n)
    }

    /// Total shares held across the population
    pub fn total_position(&self) -> Quantity {
        self.traders.iter().map(|t| t.holdings().position).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentsConfig;
    use bourse_agents::{ClassifierConfig, GeneticConfig};

    fn small() -> SimulationConfig {
        SimulationConfig::default().with_warmup(50).with_agents(AgentsConfig {
            classifiers: 5,
            classifier: ClassifierConfig::default()
                .with_num_rules(20)
                .with_ga(GeneticConfig {
                    interval: 10,
                    first_time: 10,
                    ..Default::default()
                }),
            ..Default::default()
        })
    }

    #[test]
    fn test_time_advances() {
        let mut sim = Simulation::new(small()).unwrap();
        assert_eq!(sim.time(), 0);
        let step = sim.advance();
        assert_eq!(step.time, 0);
        assert_eq!(sim.time(), 1);
        assert_eq!(sim.last_step(), Some(&step));
        assert_eq!(sim.price(), step.price);
        assert_eq!(sim.volume(), step.volume);
    }

    #[test]
    fn test_warmup_prices_at_risk_neutral() {
        let sim = Simulation::new(small()).unwrap();
        let market = sim.market();
        approx::assert_relative_eq!(sim.price(), market.risk_neutral_price(), epsilon = 1e-12);
    }

    #[test]
    fn test_queries_by_agent() {
        let sim = Simulation::new(small()).unwrap();
        assert_eq!(sim.agents().len(), 5);
        assert!(sim.rule_stats(AgentId(4)).is_some());
        assert!(sim.rule_stats(AgentId(5)).is_none());
        assert_eq!(sim.last_ga_time(AgentId(0)), None);
        assert_eq!(sim.world_bit("on"), Some(true));
        assert_eq!(sim.world_bit("off"), Some(false));
        assert_eq!(sim.world_bit("nonsense"), None);
    }

    #[test]
    fn test_run_summary() {
        let mut sim = Simulation::new(small()).unwrap();
        let summary = sim.run(25);
        assert_eq!(summary.steps, 25);
        assert!(summary.mean_price > 0.0);
        // Generations at t = 10 and 20 for each of 5 agents
        assert_eq!(summary.generations, 10);
        assert_eq!(sim.last_ga_time(AgentId(3)), Some(20));
    }
}
