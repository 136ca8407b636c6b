//! Exit policy implementations for the pairs position.
//!
//! The z-score stop lives in the signal rule; this module provides the
//! independent dollar stop through the `ExitPolicy` trait, and the
//! `StopPolicy` that decides which trigger wins when both fire.

use crate::types::ExitReason;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which trigger is reported when several exits fire on the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StopPrecedence {
    /// The dollar stop overrides any signal, including Hold and Exit.
    #[default]
    DollarFirst,
    /// Signal exits (Exit, StopLossExit) win; the dollar stop only acts on Hold.
    SignalFirst,
}

/// P&L figure the dollar stop is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DollarStopBasis {
    /// Net P&L the trade would book if closed now (after entry and exit fees).
    #[default]
    RealizedIfClosed,
    /// Gross mark-to-market P&L.
    Unrealized,
}

/// Precedence and basis for the dual stop-loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StopPolicy {
    #[serde(default)]
    pub precedence: StopPrecedence,
    #[serde(default)]
    pub basis: DollarStopBasis,
}

/// Mark-to-market view of an open position handed to exit policies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMark {
    /// Gross P&L at current prices
    pub unrealized_pnl: Decimal,
    /// Fees already paid on entry
    pub entry_fees: Decimal,
    /// Fees a close at current prices would cost
    pub exit_fees: Decimal,
}

impl PositionMark {
    pub fn realized_if_closed(&self) -> Decimal {
        self.unrealized_pnl - self.entry_fees - self.exit_fees
    }
}

/// Policy that may force a position closed regardless of the signal.
pub trait ExitPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the exit reason if the position should be closed now.
    fn should_exit(&self, mark: &PositionMark) -> Option<ExitReason>;
}

/// Forced exit once the loss exceeds a fixed dollar amount.
#[derive(Debug, Clone)]
pub struct DollarStopPolicy {
    /// Positive loss limit in USD
    max_loss: Decimal,
    basis: DollarStopBasis,
}

impl DollarStopPolicy {
    pub fn new(max_loss: Decimal, basis: DollarStopBasis) -> Self {
        Self {
            max_loss: max_loss.abs(),
            basis,
        }
    }

    pub fn max_loss(&self) -> Decimal {
        self.max_loss
    }
}

impl ExitPolicy for DollarStopPolicy {
    fn should_exit(&self, mark: &PositionMark) -> Option<ExitReason> {
        let pnl = match self.basis {
            DollarStopBasis::RealizedIfClosed => mark.realized_if_closed(),
            DollarStopBasis::Unrealized => mark.unrealized_pnl,
        };
        // Loss strictly beyond the limit: -500.01 < -500 triggers, -500 does not.
        (pnl < -self.max_loss).then_some(ExitReason::DollarStop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn mark(unrealized: Decimal, fees: Decimal) -> PositionMark {
        PositionMark {
            unrealized_pnl: unrealized,
            entry_fees: fees,
            exit_fees: fees,
        }
    }

    #[test]
    fn test_dollar_stop_threshold_is_strict() {
        let policy = DollarStopPolicy::new(dec!(500), DollarStopBasis::Unrealized);
        assert_eq!(policy.should_exit(&mark(dec!(-500), dec!(0))), None);
        assert_eq!(
            policy.should_exit(&mark(dec!(-500.01), dec!(0))),
            Some(ExitReason::DollarStop)
        );
        assert_eq!(policy.should_exit(&mark(dec!(250), dec!(0))), None);
    }

    #[test]
    fn test_realized_basis_includes_fees() {
        let m = mark(dec!(-480), dec!(15));
        assert_eq!(m.realized_if_closed(), dec!(-510));

        let realized = DollarStopPolicy::new(dec!(500), DollarStopBasis::RealizedIfClosed);
        let unrealized = DollarStopPolicy::new(dec!(500), DollarStopBasis::Unrealized);
        assert_eq!(realized.should_exit(&m), Some(ExitReason::DollarStop));
        assert_eq!(unrealized.should_exit(&m), None);
    }

    #[test]
    fn test_negative_limit_is_normalized() {
        let policy = DollarStopPolicy::new(dec!(-500), DollarStopBasis::Unrealized);
        assert_eq!(policy.max_loss(), dec!(500));
    }

    #[test]
    fn test_stop_policy_serde_defaults() {
        let policy: StopPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy.precedence, StopPrecedence::DollarFirst);
        assert_eq!(policy.basis, DollarStopBasis::RealizedIfClosed);
    }
}
