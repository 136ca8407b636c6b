//! CSV Trade Recorder
//!
//! Appends closed trades to a CSV file, writing the header once for a new or
//! empty file.

use super::recorder::{csv_header, write_csv_to, RecordError, TradeRecorder};
use crate::backtest::position::Trade;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// CSV file recorder
pub struct CsvRecorder {
    file_path: PathBuf,
    /// Serializes writes and tracks header state
    state: Mutex<CsvState>,
}

struct CsvState {
    header_written: bool,
}

impl CsvRecorder {
    /// Create a new CSV recorder
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            state: Mutex::new(CsvState {
                header_written: false,
            }),
        }
    }
}

impl TradeRecorder for CsvRecorder {
    fn record(&self, trade: &Trade) -> Result<(), RecordError> {
        // Handle mutex poisoning gracefully
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let needs_header = !guard.header_written
            && std::fs::metadata(&self.file_path)
                .map(|m| m.len() == 0)
                .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        let mut writer = BufWriter::new(file);

        if needs_header {
            writeln!(writer, "{}", csv_header())?;
        }
        guard.header_written = true;

        write_csv_to(trade, &mut writer)?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::recorder::tests::sample_trade;
    use tempfile::tempdir;

    #[test]
    fn test_csv_recorder_writes_header_once() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("trades.csv");

        let recorder = CsvRecorder::new(file_path.clone());
        recorder.record(&sample_trade()).unwrap();
        recorder.record(&sample_trade()).unwrap();

        let contents = std::fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], csv_header());
        assert!(lines[1].contains("LongSpread"));
    }

    #[test]
    fn test_csv_recorder_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("trades.csv");

        CsvRecorder::new(file_path.clone())
            .record(&sample_trade())
            .unwrap();
        // A second recorder on the same file must not repeat the header
        CsvRecorder::new(file_path.clone())
            .record(&sample_trade())
            .unwrap();

        let contents = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(contents.matches("entry_time").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }
}
