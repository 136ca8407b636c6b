//! Trade Recording System
//!
//! Provides a pluggable `TradeRecorder` trait for recording closed trades to various backends:
//! - CSV file (offline analysis)
//! - Structured tracing events (observability)

use crate::backtest::position::Trade;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error type for trade recording operations
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Formats a millisecond timestamp as RFC 3339, falling back to the raw value.
pub(crate) fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

/// CSV header matching [`write_csv_to`].
pub fn csv_header() -> &'static str {
    "entry_time,exit_time,side,entry_price_a,entry_price_b,exit_price_a,exit_price_b,size_a,size_b,hedge_ratio,gross_pnl,fees,realized_pnl,exit_reason"
}

/// Write a trade as one CSV line directly to a writer (no trailing newline).
pub fn write_csv_to<W: std::io::Write>(trade: &Trade, writer: &mut W) -> std::io::Result<()> {
    write!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        format_timestamp(trade.entry_timestamp),
        format_timestamp(trade.exit_timestamp),
        trade.side,
        trade.entry_price_a,
        trade.entry_price_b,
        trade.exit_price_a,
        trade.exit_price_b,
        trade.size_a.round_dp(8),
        trade.size_b.round_dp(8),
        trade.hedge_ratio,
        trade.gross_pnl.round_dp(2),
        trade.fees.round_dp(2),
        trade.realized_pnl.round_dp(2),
        trade.exit_reason,
    )
}

/// Trait for recording trades to various backends
pub trait TradeRecorder: Send + Sync {
    /// Record one closed trade.
    fn record(&self, trade: &Trade) -> Result<(), RecordError>;

    /// Flush any buffered records (optional, default no-op)
    fn flush(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

/// A recorder that fans out to multiple backends
#[derive(Default)]
pub struct MultiRecorder {
    recorders: Vec<Box<dyn TradeRecorder>>,
}

impl MultiRecorder {
    /// Create a new multi-recorder with the given backends
    pub fn new(recorders: Vec<Box<dyn TradeRecorder>>) -> Self {
        Self { recorders }
    }

    /// Add a recorder
    pub fn add(&mut self, recorder: Box<dyn TradeRecorder>) {
        self.recorders.push(recorder);
    }
}

impl TradeRecorder for MultiRecorder {
    fn record(&self, trade: &Trade) -> Result<(), RecordError> {
        let mut error_count = 0;
        let mut last_error = None;

        for recorder in &self.recorders {
            if let Err(e) = recorder.record(trade) {
                // Best-effort: one failing backend does not stop the others
                tracing::error!(error = %e, "Failed to record trade to backend");
                last_error = Some(e);
                error_count += 1;
            }
        }

        // Only an error when every backend failed
        if error_count > 0 && error_count == self.recorders.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(())
    }

    fn flush(&self) -> Result<(), RecordError> {
        for recorder in &self.recorders {
            recorder.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{ExitReason, PositionSide};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub(crate) fn sample_trade() -> Trade {
        Trade {
            side: PositionSide::LongSpread,
            entry_timestamp: 1_700_000_000_000,
            exit_timestamp: 1_700_086_400_000,
            entry_price_a: dec!(100),
            entry_price_b: dec!(100),
            exit_price_a: dec!(90),
            exit_price_b: dec!(110),
            size_a: dec!(125),
            size_b: dec!(125),
            hedge_ratio: 1.0,
            gross_pnl: dec!(2500),
            fees: dec!(0),
            realized_pnl: dec!(2500),
            exit_reason: ExitReason::Signal,
        }
    }

    struct Failing;

    impl TradeRecorder for Failing {
        fn record(&self, _trade: &Trade) -> Result<(), RecordError> {
            Err(RecordError::Serialization("boom".to_string()))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl TradeRecorder for Counting {
        fn record(&self, _trade: &Trade) -> Result<(), RecordError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_trade_csv_line() {
        let mut buf = Vec::new();
        write_csv_to(&sample_trade(), &mut buf).unwrap();
        let line = String::from_utf8(buf).unwrap();
        assert!(line.starts_with("2023-11-14T22:13:20+00:00,"));
        assert!(line.contains("LongSpread"));
        assert!(line.ends_with("2500,signal"));
        assert_eq!(
            line.split(',').count(),
            csv_header().split(',').count()
        );
    }

    #[test]
    fn test_multi_recorder_tolerates_partial_failure() {
        let count = Arc::new(AtomicUsize::new(0));
        let multi = MultiRecorder::new(vec![
            Box::new(Failing),
            Box::new(Counting(Arc::clone(&count))),
        ]);
        assert!(multi.record(&sample_trade()).is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let all_failing = MultiRecorder::new(vec![Box::new(Failing)]);
        assert!(all_failing.record(&sample_trade()).is_err());
    }
}
