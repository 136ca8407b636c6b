//! Tracing-based Trade Recorder
//!
//! Emits one structured event per closed trade under the `trades` target, so
//! a subscriber filter such as `RUST_LOG=trades=info` isolates them.

use super::recorder::{format_timestamp, RecordError, TradeRecorder};
use crate::backtest::position::Trade;
use tracing::info;

/// Recorder that emits structured tracing logs
#[derive(Debug, Default)]
pub struct TracingRecorder;

impl TracingRecorder {
    /// Create a new tracing recorder
    pub fn new() -> Self {
        Self
    }
}

impl TradeRecorder for TracingRecorder {
    fn record(&self, trade: &Trade) -> Result<(), RecordError> {
        info!(
            target: "trades",
            trade_type = "CLOSED",
            side = %trade.side,
            entry_time = %format_timestamp(trade.entry_timestamp),
            exit_time = %format_timestamp(trade.exit_timestamp),
            size_a = %trade.size_a.round_dp(4),
            size_b = %trade.size_b.round_dp(4),
            hedge_ratio = trade.hedge_ratio,
            fees = %trade.fees.round_dp(2),
            pnl = %trade.realized_pnl.round_dp(2),
            exit_reason = %trade.exit_reason,
            "Trade closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::recorder::tests::sample_trade;

    #[test]
    fn test_tracing_recorder_does_not_error() {
        let recorder = TracingRecorder::new();
        recorder.record(&sample_trade()).unwrap();
    }
}
