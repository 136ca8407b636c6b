//! Objective function: one full backtest per candidate, scored by Sharpe.

use super::config::CandidateParams;
use crate::analytics::PerformanceReport;
use crate::backtest::BacktestEngine;
use crate::config::PipelineConfig;
use crate::error::{PairsError, Result};
use crate::types::PriceObservation;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome record for a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial_id: usize,
    pub params: CandidateParams,
    /// Sharpe ratio; `-inf` for failed trials and undefined Sharpe
    #[serde(with = "score_serde")]
    pub score: f64,
    pub report: Option<PerformanceReport>,
    /// Error category and message when the trial failed
    pub failure: Option<String>,
}

impl TrialResult {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn trade_count(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.trade_count)
    }
}

/// Build a fresh pipeline for `params`, replay `history`, and score it.
///
/// Never fails: errors are captured as a [`PairsError::TrialFailure`] record
/// with score `-inf`.
pub fn evaluate(
    trial_id: usize,
    params: CandidateParams,
    base: &PipelineConfig,
    history: &[PriceObservation],
) -> TrialResult {
    match run_trial(&params, base, history) {
        Ok(report) => {
            let score = report.sharpe.value().unwrap_or(f64::NEG_INFINITY);
            debug!(
                trial_id,
                process_noise = params.process_noise,
                obs_noise = params.obs_noise,
                score,
                trades = report.trade_count,
                "Trial complete"
            );
            TrialResult {
                trial_id,
                params,
                score,
                report: Some(report),
                failure: None,
            }
        }
        Err(source) => {
            let failure = PairsError::TrialFailure {
                trial_id,
                source: Box::new(source),
            };
            warn!(trial_id, error = %failure, "Trial failed");
            TrialResult {
                trial_id,
                params,
                score: f64::NEG_INFINITY,
                report: None,
                failure: Some(failure.to_string()),
            }
        }
    }
}

fn run_trial(
    params: &CandidateParams,
    base: &PipelineConfig,
    history: &[PriceObservation],
) -> Result<PerformanceReport> {
    let engine = BacktestEngine::new(params.apply(base))?;
    Ok(engine.run(history)?.report)
}

/// JSON has no infinities; `-inf` scores are written as `null`.
mod score_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if score.is_finite() {
            serializer.serialize_some(score)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate, SyntheticPairConfig};

    fn params(q: f64, r: f64) -> CandidateParams {
        CandidateParams {
            process_noise: q,
            obs_noise: r,
            entry_threshold: None,
            exit_threshold: None,
        }
    }

    #[test]
    fn test_failed_trial_scores_negative_infinity() {
        let history = generate(&SyntheticPairConfig {
            observations: 100,
            ..Default::default()
        })
        .unwrap();
        let result = evaluate(7, params(-1.0, 1e-3), &PipelineConfig::default(), &history);
        assert!(result.is_failure());
        assert_eq!(result.score, f64::NEG_INFINITY);
        assert!(result.failure.unwrap().starts_with("Trial 7 failed"));
    }

    #[test]
    fn test_insufficient_history_is_a_failure_not_a_panic() {
        let history = vec![PriceObservation::new(0, 10.0, 10.0)];
        let result = evaluate(0, params(1e-5, 1e-3), &PipelineConfig::default(), &history);
        assert!(result.is_failure());
        assert_eq!(result.trade_count(), 0);
    }

    #[test]
    fn test_score_serializes_as_null_when_infinite() {
        let history = vec![PriceObservation::new(0, 10.0, 10.0)];
        let result = evaluate(0, params(1e-5, 1e-3), &PipelineConfig::default(), &history);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["score"].is_null());
        let back: TrialResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.score, f64::NEG_INFINITY);
    }
}
