//! Genetic Algorithm
//!
//! One generation over a rule population:
//!
//! ```text
//! rank by strength ──► pool = weakest floor(pool_fraction * n), rule 0 excluded
//!        │
//!        ▼
//! tournament parents ──► crossover | copy ──► mutate ──► generalize ──► seed
//!                                                                        │
//!        ┌───────────────────────────────────────────────────────────────┘
//!        ▼
//! replace the more similar of two random pool members
//!        │
//!        ▼
//! generalize long-idle rules, reset rule 0 coefficients
//! ```

use bourse_core::{Condition, Time, Trit, word_count};
use rand::Rng;
use rand::seq::index;

use crate::config::{ClassifierConfig, CoefficientRange};
use crate::rule::Rule;

/// Attempts at drawing a second parent distinct from the first
const MAX_PARENT_DRAWS: usize = 10;

/// Result of one generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    /// Indices overwritten by offspring
    pub replaced: Vec<usize>,
    /// Long-idle rules that lost specified bits
    pub generalized: usize,
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Median and median absolute deviation
fn median_mad(values: &[f64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    let med = median(&mut sorted);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    (med, median(&mut deviations))
}

/// Two distinct random rules, the stronger wins
fn tournament<R: Rng + ?Sized>(rules: &[Rule], rng: &mut R) -> usize {
    let n = rules.len();
    let i = rng.gen_range(0..n);
    let mut j = rng.gen_range(0..n - 1);
    if j >= i {
        j += 1;
    }
    if rules[j].strength > rules[i].strength { j } else { i }
}

fn ranges(config: &ClassifierConfig) -> [CoefficientRange; 3] {
    [config.a_range, config.b_range, config.c_range]
}

fn crossover<R: Rng + ?Sized>(
    first: &Rule,
    second: &Rule,
    config: &ClassifierConfig,
    time: Time,
    rng: &mut R,
) -> Rule {
    let words = word_count(first.condition.len());
    let mask: Vec<u64> = (0..words).map(|_| rng.next_u64()).collect();
    let condition = Condition::uniform_crossover(&first.condition, &second.condition, &mask);

    let (ca, cb) = (first.coefficients(), second.coefficients());
    let choice: f64 = rng.r#gen();
    let coefficients = if choice < config.ga.p_linear {
        let (sa, sb) = (first.strength.max(0.0), second.strength.max(0.0));
        let wa = if sa + sb > 0.0 { sa / (sa + sb) } else { 0.5 };
        [0, 1, 2].map(|k| wa * ca[k] + (1.0 - wa) * cb[k])
    } else if choice < config.ga.p_linear + config.ga.p_random {
        [0, 1, 2].map(|k| if rng.gen_bool(0.5) { ca[k] } else { cb[k] })
    } else if rng.gen_bool(0.5) {
        ca
    } else {
        cb
    };

    let [a, b, c] = coefficients;
    Rule::with_condition(condition, a, b, c, config.init_var, time)
}

fn mutate<R: Rng + ?Sized>(rule: &mut Rule, config: &ClassifierConfig, rng: &mut R) {
    let ga = &config.ga;
    for i in 0..rule.condition.len() {
        if !rng.gen_bool(ga.p_mutation) {
            continue;
        }
        let trit = rule.condition.get(i);
        let mutated = match trit {
            Trit::DontCare => match rng.gen_range(0..3) {
                0 => Trit::Zero,
                1 => Trit::One,
                _ => Trit::DontCare,
            },
            specified => {
                if rng.gen_range(0..3) > 0 {
                    Trit::DontCare
                } else {
                    specified.flipped()
                }
            }
        };
        rule.condition.set(i, mutated);
    }

    let mut coefficients = rule.coefficients();
    for (x, range) in coefficients.iter_mut().zip(ranges(config)) {
        let choice: f64 = rng.r#gen();
        if choice < ga.p_long {
            *x = range.min + rng.r#gen::<f64>() * range.width();
        } else if choice < ga.p_long + ga.p_short {
            let step = range.width() * ga.nhood * rng.gen_range(-1.0..=1.0);
            *x = range.clamp(*x + step);
        }
    }
    rule.set_coefficients(coefficients);
}

fn generalize<R: Rng + ?Sized>(rule: &mut Rule, p_generalize: f64, rng: &mut R) {
    for i in rule.condition.specified_bits() {
        if rng.gen_bool(p_generalize) {
            rule.condition.set(i, Trit::DontCare);
        }
    }
}

/// Drop `ceil(specificity * fraction)` random specified bits
fn drop_bits<R: Rng + ?Sized>(rule: &mut Rule, fraction: f64, rng: &mut R) {
    let specified = rule.condition.specified_bits();
    if specified.is_empty() {
        return;
    }
    let drop = ((specified.len() as f64 * fraction).ceil() as usize).min(specified.len());
    for k in index::sample(rng, specified.len(), drop) {
        rule.condition.set(specified[k], Trit::DontCare);
    }
}

/// Inverse-variance-weighted mean coefficients over the non-default rules
/// that have been matched at least once
fn consensus_coefficients(rules: &[Rule]) -> Option<[f64; 3]> {
    let mut sum = [0.0; 3];
    let mut total = 0.0;
    for rule in rules.iter().skip(1).filter(|r| r.count > 0 && r.variance > 0.0) {
        let w = 1.0 / rule.variance;
        total += w;
        for (s, x) in sum.iter_mut().zip(rule.coefficients()) {
            *s += w * x;
        }
    }
    (total > 0.0).then(|| sum.map(|s| s / total))
}

/// Run one generation over `rules` at `time`.
///
/// `price` and `dividend` prime the offspring's forecasts. Rule 0 is never
/// replaced. `config` must have passed `ClassifierConfig::validate` for
/// `rules.len()` rules.
pub fn run_generation<R: Rng + ?Sized>(
    rules: &mut [Rule],
    config: &ClassifierConfig,
    time: Time,
    price: f64,
    dividend: f64,
    rng: &mut R,
) -> Generation {
    let n = rules.len();
    let n_pool = config.ga.pool_size(n);
    debug_assert!(
        n >= 3 && n_pool > 0 && n_pool < n,
        "genetic config not validated for {n} rules"
    );

    // Weakest first; equal strengths keep index order
    let mut ranked: Vec<usize> = (1..n).collect();
    ranked.sort_by(|&i, &j| rules[i].strength.total_cmp(&rules[j].strength));
    let mut pool: Vec<usize> = ranked[..n_pool].to_vec();

    let mut survivor_strengths: Vec<f64> = ranked[n_pool..]
        .iter()
        .chain(std::iter::once(&0))
        .map(|&i| rules[i].strength)
        .collect();
    let seed_strength = median(&mut survivor_strengths);

    let variances: Vec<f64> = rules.iter().map(|r| r.variance).collect();
    let (var_median, var_mad) = median_mad(&variances);
    let seed_variance = (var_median + config.ga.variance_inflation * var_mad).max(config.min_variance);

    let parents: &[Rule] = rules;
    let mut offspring = Vec::with_capacity(n_pool);
    for _ in 0..n_pool {
        let first = tournament(parents, rng);
        let mut child = if rng.gen_bool(config.ga.p_crossover) {
            let second = (0..MAX_PARENT_DRAWS)
                .map(|_| tournament(parents, rng))
                .find(|&k| k != first);
            match second {
                Some(second) => crossover(&parents[first], &parents[second], config, time, rng),
                None => parents[first].clone(),
            }
        } else {
            parents[first].clone()
        };

        mutate(&mut child, config, rng);
        generalize(&mut child, config.ga.p_generalize, rng);

        child.variance = seed_variance;
        child.strength = seed_strength - config.bit_cost * child.specificity() as f64;
        child.count = 0;
        child.birth = time;
        child.last_active = Some(time);
        child.last_used = None;
        child.update_forecast(price, dividend);
        child.last_forecast = child.forecast;
        offspring.push(child);
    }

    let mut replaced = Vec::with_capacity(n_pool);
    for child in offspring {
        let slot = if pool.len() >= 2 {
            let pair = index::sample(rng, pool.len(), 2);
            let (x, y) = (pair.index(0), pair.index(1));
            let dx = rules[pool[x]].condition.distance(&child.condition);
            let dy = rules[pool[y]].condition.distance(&child.condition);
            if dy < dx { y } else { x }
        } else {
            0
        };
        let target = pool.swap_remove(slot);
        rules[target] = child;
        replaced.push(target);
    }

    let mut generalized = 0;
    for rule in rules.iter_mut().skip(1) {
        let idle_since = rule.last_active.unwrap_or(rule.birth);
        if time.saturating_sub(idle_since) <= config.ga.long_time {
            continue;
        }
        drop_bits(rule, config.ga.gen_fraction, rng);
        rule.variance = seed_variance;
        rule.strength = seed_strength - config.bit_cost * rule.specificity() as f64;
        rule.count = 0;
        rule.last_active = Some(time);
        generalized += 1;
    }

    if let Some(coefficients) = consensus_coefficients(rules) {
        rules[0].set_coefficients(coefficients);
    }

    Generation {
        replaced,
        generalized,
    }
}
