//! Black-box search over the filter noise parameters (and optionally the
//! z-score thresholds), maximizing the Sharpe ratio of a full backtest.
//!
//! # Pipeline
//! 1. Split the history if walk-forward validation is configured
//! 2. Propose a batch of candidates (sequentially, from one seeded RNG)
//! 3. Evaluate the batch in parallel, each trial on its own fresh pipeline
//! 4. Repeat until the trial budget is spent, then pick the best eligible trial
//! 5. Optionally replay the best candidate on the held-out slice

pub mod config;
pub mod objective;
pub mod search;

pub use config::{CandidateParams, ParamRange, SearchConfig, SearchMethod, SearchSpace};
pub use objective::{evaluate, TrialResult};
pub use search::{sampler_for, GridSampler, RandomSampler, Sampler, TpeSampler};

use crate::config::PipelineConfig;
use crate::error::{PairsError, Result};
use crate::types::PriceObservation;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything a search produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResults {
    /// Every trial in id order, failures included
    pub trials: Vec<TrialResult>,
    /// Highest-scoring trial with a defined Sharpe and at least `min_trades` trades
    pub best: Option<TrialResult>,
    /// The best candidate replayed on the held-out slice (walk-forward only)
    pub validation: Option<TrialResult>,
    /// Observations used for the search (the train slice under walk-forward)
    pub train_observations: usize,
}

impl OptimizationResults {
    pub fn failed_trials(&self) -> usize {
        self.trials.iter().filter(|t| t.is_failure()).count()
    }
}

/// Runs the configured search against one base pipeline.
#[derive(Debug, Clone)]
pub struct ParameterOptimizer {
    base: PipelineConfig,
    search: SearchConfig,
}

impl ParameterOptimizer {
    pub fn new(base: PipelineConfig, search: SearchConfig) -> Result<Self> {
        base.validate()?;
        search.validate()?;
        Ok(Self { base, search })
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Search over `history`. Individual trial errors never abort the search.
    ///
    /// Deterministic: the same configs and history give identical results
    /// regardless of thread count.
    pub fn optimize(&self, history: &[PriceObservation]) -> Result<OptimizationResults> {
        let (train, test) = self.split(history)?;

        info!(
            method = ?self.search.method,
            n_trials = self.search.n_trials,
            batch_size = self.search.batch_size,
            train = train.len(),
            test = test.map_or(0, |t| t.len()),
            "Starting parameter search"
        );

        let mut rng = StdRng::seed_from_u64(self.search.seed);
        let mut sampler = sampler_for(&self.search);
        let mut trials: Vec<TrialResult> = Vec::with_capacity(self.search.n_trials);

        while trials.len() < self.search.n_trials {
            let batch_len = self
                .search
                .batch_size
                .min(self.search.n_trials - trials.len());

            let batch: Vec<CandidateParams> = (0..batch_len)
                .map_while(|_| sampler.suggest(&trials, &mut rng))
                .collect();
            if batch.is_empty() {
                break;
            }

            let start = trials.len();
            let results: Vec<TrialResult> = batch
                .into_par_iter()
                .enumerate()
                .map(|(offset, params)| evaluate(start + offset, params, &self.base, train))
                .collect();
            trials.extend(results);
        }

        let best = self.select_best(&trials);
        match &best {
            Some(trial) => info!(
                trial_id = trial.trial_id,
                sharpe = trial.score,
                process_noise = trial.params.process_noise,
                obs_noise = trial.params.obs_noise,
                "Best candidate"
            ),
            None => warn!(
                trials = trials.len(),
                min_trades = self.search.min_trades,
                "No eligible candidate"
            ),
        }

        let validation = match (&best, test) {
            (Some(trial), Some(test)) => {
                let result = evaluate(trial.trial_id, trial.params, &self.base, test);
                info!(
                    trial_id = trial.trial_id,
                    in_sample = trial.score,
                    out_of_sample = result.score,
                    "Walk-forward validation"
                );
                Some(result)
            }
            _ => None,
        };

        let results = OptimizationResults {
            trials,
            best,
            validation,
            train_observations: train.len(),
        };
        info!(
            trials = results.trials.len(),
            failed = results.failed_trials(),
            "Parameter search complete"
        );
        Ok(results)
    }

    fn split<'a>(
        &self,
        history: &'a [PriceObservation],
    ) -> Result<(&'a [PriceObservation], Option<&'a [PriceObservation]>)> {
        match self.search.train_ratio {
            None => Ok((history, None)),
            Some(ratio) => {
                let cut = (history.len() as f64 * ratio).floor() as usize;
                if cut == 0 || cut >= history.len() {
                    return Err(PairsError::InsufficientData {
                        expected: 2,
                        actual: history.len(),
                    });
                }
                let (train, test) = history.split_at(cut);
                Ok((train, Some(test)))
            }
        }
    }

    /// Highest finite score among trials with enough trades; ties go to the lower id.
    fn select_best(&self, trials: &[TrialResult]) -> Option<TrialResult> {
        trials
            .iter()
            .filter(|t| t.score.is_finite() && t.trade_count() >= self.search.min_trades)
            .fold(None, |best: Option<&TrialResult>, t| match best {
                Some(b) if b.score >= t.score => Some(b),
                _ => Some(t),
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate, SyntheticPairConfig};

    fn history() -> Vec<PriceObservation> {
        generate(&SyntheticPairConfig {
            observations: 300,
            ..Default::default()
        })
        .unwrap()
    }

    fn small_search(method: SearchMethod) -> SearchConfig {
        SearchConfig {
            method,
            n_trials: 12,
            n_startup_trials: 4,
            batch_size: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_runs_full_budget_in_id_order() {
        let optimizer =
            ParameterOptimizer::new(PipelineConfig::default(), small_search(SearchMethod::Tpe))
                .unwrap();
        let results = optimizer.optimize(&history()).unwrap();
        assert_eq!(results.trials.len(), 12);
        for (i, trial) in results.trials.iter().enumerate() {
            assert_eq!(trial.trial_id, i);
        }
        if let Some(best) = &results.best {
            assert!(results.trials.iter().all(|t| t.score <= best.score));
        }
    }

    #[test]
    fn test_grid_respects_budget() {
        let optimizer =
            ParameterOptimizer::new(PipelineConfig::default(), small_search(SearchMethod::Grid))
                .unwrap();
        let results = optimizer.optimize(&history()).unwrap();
        // 3 x 3 grid fits in 12 trials
        assert_eq!(results.trials.len(), 9);
    }

    #[test]
    fn test_min_trades_excludes_candidates() {
        let search = SearchConfig {
            min_trades: usize::MAX,
            ..small_search(SearchMethod::Random)
        };
        let optimizer = ParameterOptimizer::new(PipelineConfig::default(), search).unwrap();
        let results = optimizer.optimize(&history()).unwrap();
        assert!(results.best.is_none());
        assert_eq!(results.trials.len(), 12);
    }

    #[test]
    fn test_walk_forward_split() {
        let search = SearchConfig {
            train_ratio: Some(0.7),
            ..small_search(SearchMethod::Random)
        };
        let optimizer = ParameterOptimizer::new(PipelineConfig::default(), search).unwrap();
        let results = optimizer.optimize(&history()).unwrap();
        assert_eq!(results.train_observations, 210);
        assert_eq!(results.validation.is_some(), results.best.is_some());
    }

    #[test]
    fn test_rejects_invalid_search_config() {
        let search = SearchConfig {
            n_trials: 0,
            ..Default::default()
        };
        assert!(ParameterOptimizer::new(PipelineConfig::default(), search).is_err());
    }
}
