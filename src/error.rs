//! Error taxonomy for the pairs pipeline.
//!
//! Every failure a backtest run or an optimizer trial can produce maps to one
//! named category. A run either completes with a full report or terminates
//! with one of these; there is no partial result.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by the estimator, signal layer, backtest engine and optimizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairsError {
    /// Non-finite, non-positive or out-of-order price input.
    #[error("Invalid observation at {timestamp}: {reason}")]
    InvalidObservation { timestamp: i64, reason: String },

    /// Configuration rejected at construction time.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Rolling standard deviation collapsed while computing a z-score.
    #[error("Degenerate statistics at {timestamp}: std dev {std_dev:e} below {min_std:e}")]
    DegenerateStatistics {
        timestamp: i64,
        std_dev: f64,
        min_std: f64,
    },

    /// The position state machine was driven through an illegal transition.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Account equity reached zero or below; returns are undefined from here on.
    #[error("Equity exhausted at {timestamp}: {equity}")]
    EquityExhausted { timestamp: i64, equity: Decimal },

    /// Not enough observations to run the requested operation.
    #[error("Insufficient data: expected at least {expected} data points, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// A single optimizer trial failed; the search itself continues.
    #[error("Trial {trial_id} failed: {source}")]
    TrialFailure {
        trial_id: usize,
        #[source]
        source: Box<PairsError>,
    },
}

impl PairsError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_observation(timestamp: i64, reason: impl Into<String>) -> Self {
        Self::InvalidObservation {
            timestamp,
            reason: reason.into(),
        }
    }

    /// Short, stable name of the category (used in logs and trial records).
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidObservation { .. } => "InvalidObservation",
            Self::InvalidParameter { .. } => "InvalidParameter",
            Self::DegenerateStatistics { .. } => "DegenerateStatistics",
            Self::InvariantViolation(_) => "InvariantViolation",
            Self::EquityExhausted { .. } => "EquityExhausted",
            Self::InsufficientData { .. } => "InsufficientData",
            Self::TrialFailure { .. } => "TrialFailure",
        }
    }
}

pub type Result<T> = std::result::Result<T, PairsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_failure_wraps_source() {
        let inner = PairsError::invalid_parameter("obs_noise", "must be positive, got 0");
        let err = PairsError::TrialFailure {
            trial_id: 7,
            source: Box::new(inner),
        };
        assert_eq!(err.category(), "TrialFailure");
        let msg = err.to_string();
        assert!(msg.contains("Trial 7"));
        assert!(msg.contains("obs_noise"));
    }
}
