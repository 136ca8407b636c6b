//! Common Types Module
//!
//! Shared types used across the pipeline to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// One timestamp-aligned price pair for the two legs.
///
/// Leg A is the independent instrument (`x`), leg B the dependent one (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub price_a: f64,
    pub price_b: f64,
}

impl PriceObservation {
    pub fn new(timestamp: i64, price_a: f64, price_b: f64) -> Self {
        Self {
            timestamp,
            price_a,
            price_b,
        }
    }
}

/// Filtered spread for one step: `spread = price_b - hedge_ratio * price_a`.
///
/// The hedge ratio is the post-correction estimate for this same step, so the
/// sample never depends on a later observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadSample {
    pub timestamp: i64,
    pub hedge_ratio: f64,
    pub spread: f64,
}

/// Which way the single live position faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PositionSide {
    #[default]
    Flat,
    /// Long leg B, short leg A: profits when the spread rises
    LongSpread,
    /// Short leg B, long leg A: profits when the spread falls
    ShortSpread,
}

impl PositionSide {
    pub fn is_open(&self) -> bool {
        !matches!(self, PositionSide::Flat)
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Flat => write!(f, "Flat"),
            PositionSide::LongSpread => write!(f, "LongSpread"),
            PositionSide::ShortSpread => write!(f, "ShortSpread"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// Mean reversion: |z| fell inside the exit band
    Signal,
    /// |z| reached the stop-loss threshold
    ZScoreStop,
    /// Loss exceeded the dollar limit
    DollarStop,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::ZScoreStop => write!(f, "zscore-stop"),
            ExitReason::DollarStop => write!(f, "dollar-stop"),
        }
    }
}
