//! Optimize command handler.
//!
//! Implements the `optimize` subcommand: a parallel search over filter noise
//! (and optionally thresholds) scored by backtest Sharpe ratio.

use super::write_json;
use crate::cli::OptimizeCliConfig;
use crate::config::PipelineConfig;
use crate::optimizer::{OptimizationResults, ParameterOptimizer, SearchConfig};

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct OptimizeOutput<'a> {
    base_config: &'a PipelineConfig,
    search: &'a SearchConfig,
    observations: usize,
    /// Base config with the best candidate applied, ready for `backtest --config`
    best_config: Option<PipelineConfig>,
    #[serde(flatten)]
    results: &'a OptimizationResults,
}

/// Run a parameter search with the provided CLI configuration.
///
/// Writes `optimization.json` (every trial, the best one, and the tuned
/// pipeline config) into the output directory.
///
/// # Errors
/// Returns error if configuration or data loading fails. Individual trial
/// failures are recorded in the output, not returned.
pub fn run_optimize(config: OptimizeCliConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("--- Running Parameter Search ---");
    let base = config.pipeline()?;
    let search = config.search()?;

    let observations = config.source.load()?;
    info!(rows = observations.len(), "Data loaded");

    let optimizer = ParameterOptimizer::new(base.clone(), search)?;
    let results = optimizer.optimize(&observations)?;

    info!("--- Search Results ---");
    info!("Trials:          {}", results.trials.len());
    info!("Failed:          {}", results.failed_trials());
    match &results.best {
        Some(best) => {
            info!("Best Trial:      #{}", best.trial_id);
            info!("Sharpe:          {:.4}", best.score);
            info!("Process Noise:   {:e}", best.params.process_noise);
            info!("Obs Noise:       {:e}", best.params.obs_noise);
            if let Some(entry) = best.params.entry_threshold {
                info!("Entry Threshold: {:.3}", entry);
            }
            if let Some(exit) = best.params.exit_threshold {
                info!("Exit Threshold:  {:.3}", exit);
            }
        }
        None => warn!("No trial met the selection criteria"),
    }
    if let Some(validation) = &results.validation {
        if validation.score.is_finite() {
            info!("Out-of-Sample:   {:.4}", validation.score);
        } else {
            info!("Out-of-Sample:   undefined");
        }
    }
    info!("----------------------");

    let output = OptimizeOutput {
        base_config: &base,
        search: optimizer.search_config(),
        observations: observations.len(),
        best_config: results.best.as_ref().map(|b| b.params.apply(&base)),
        results: &results,
    };
    write_json(&config.output_dir, "optimization.json", &output)?;

    Ok(())
}
