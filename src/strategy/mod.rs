//! Trading signal layer.
//!
//! - [`signal`]: rolling z-score over the filtered spread and the entry/exit rules
//! - [`exit_policy`]: dollar stop-loss and the precedence between stop triggers
//! - [`validators`]: observation checks applied before the estimator sees a price

pub mod exit_policy;
pub mod signal;
pub mod validators;

use serde::{Deserialize, Serialize};

/// Represents a trading signal for one step.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Buy the spread: long leg B, short leg A
    EnterLongSpread,
    /// Sell the spread: short leg B, long leg A
    EnterShortSpread,
    /// Mean reversion exit
    Exit,
    Hold,
    /// |z| breached the stop-loss threshold
    StopLossExit,
}

impl Signal {
    pub fn is_entry(&self) -> bool {
        matches!(self, Signal::EnterLongSpread | Signal::EnterShortSpread)
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Signal::Exit | Signal::StopLossExit)
    }
}

pub use exit_policy::{DollarStopBasis, DollarStopPolicy, ExitPolicy, StopPolicy, StopPrecedence};
pub use signal::{RollingStats, SignalEvent, SignalGenerator, ZScoreMode};
pub use validators::{CompositeValidator, ObservationValidator, OrderingValidator, PriceValidator};
