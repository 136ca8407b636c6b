//! Seeded synthetic cointegrated pair.
//!
//! Leg A follows a geometric random walk; leg B is `β_t × A + s_t` where the
//! hedge ratio β drifts slowly and the residual `s` is a mean-reverting
//! (Ornstein-Uhlenbeck) process. Same config and seed, same series.

use crate::error::{PairsError, Result};
use crate::types::PriceObservation;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 2024-01-01T00:00:00Z
const DEFAULT_START_MS: i64 = 1_704_067_200_000;
/// Leg B never drops below this.
const PRICE_FLOOR: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPairConfig {
    pub observations: usize,
    pub seed: u64,
    pub start_timestamp: i64,
    /// Bar spacing in minutes
    pub interval_minutes: i64,
    pub initial_price_a: f64,
    /// Per-step log-return volatility of leg A
    pub volatility_a: f64,
    pub initial_hedge_ratio: f64,
    /// Per-step std dev of the hedge ratio random walk
    pub hedge_ratio_drift: f64,
    /// Pull of the residual back to zero per step, in (0, 1]
    pub mean_reversion: f64,
    /// Per-step std dev of residual shocks
    pub spread_volatility: f64,
}

impl Default for SyntheticPairConfig {
    fn default() -> Self {
        Self {
            observations: 1_000,
            seed: 42,
            start_timestamp: DEFAULT_START_MS,
            interval_minutes: 24 * 60,
            initial_price_a: 100.0,
            volatility_a: 0.01,
            initial_hedge_ratio: 1.5,
            hedge_ratio_drift: 1e-3,
            mean_reversion: 0.1,
            spread_volatility: 0.5,
        }
    }
}

fn normal(name: &'static str, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|e| PairsError::invalid_parameter(name, e.to_string()))
}

/// Generate the configured series.
pub fn generate(config: &SyntheticPairConfig) -> Result<Vec<PriceObservation>> {
    if !(config.mean_reversion > 0.0 && config.mean_reversion <= 1.0) {
        return Err(PairsError::invalid_parameter(
            "mean_reversion",
            format!("must be in (0, 1], got {}", config.mean_reversion),
        ));
    }
    if !(config.initial_price_a.is_finite() && config.initial_price_a > 0.0) {
        return Err(PairsError::invalid_parameter(
            "initial_price_a",
            format!("must be positive, got {}", config.initial_price_a),
        ));
    }
    if config.interval_minutes <= 0 {
        return Err(PairsError::invalid_parameter(
            "interval_minutes",
            format!("must be positive, got {}", config.interval_minutes),
        ));
    }

    let returns_a = normal("volatility_a", config.volatility_a)?;
    let beta_steps = normal("hedge_ratio_drift", config.hedge_ratio_drift)?;
    let shocks = normal("spread_volatility", config.spread_volatility)?;
    let step_ms = Duration::minutes(config.interval_minutes).num_milliseconds();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut price_a = config.initial_price_a;
    let mut beta = config.initial_hedge_ratio;
    let mut residual = 0.0_f64;

    let observations: Vec<PriceObservation> = (0..config.observations)
        .map(|i| {
            if i > 0 {
                price_a *= returns_a.sample(&mut rng).exp();
                beta += beta_steps.sample(&mut rng);
                residual += -config.mean_reversion * residual + shocks.sample(&mut rng);
            }
            let price_b = (beta * price_a + residual).max(PRICE_FLOOR);
            PriceObservation::new(config.start_timestamp + i as i64 * step_ms, price_a, price_b)
        })
        .collect();

    info!(
        observations = observations.len(),
        seed = config.seed,
        final_hedge_ratio = beta,
        "Generated synthetic pair"
    );
    Ok(observations)
}
