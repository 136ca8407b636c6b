//! Logging and Trade Recording Module
//!
//! - `init_tracing` - installs the global `tracing` subscriber
//! - `LogThrottle` - count-based suppression for repetitive warnings
//! - `TradeRecorder` trait - Pluggable recorder interface
//! - `CsvRecorder` - Synchronous CSV file recorder
//! - `TracingRecorder` - Structured trade events

pub mod csv_recorder;
pub mod recorder;
pub mod throttle;
pub mod tracing_recorder;

// Re-exports for convenience
pub use csv_recorder::CsvRecorder;
pub use recorder::{MultiRecorder, RecordError, TradeRecorder};
pub use throttle::LogThrottle;
pub use tracing_recorder::TracingRecorder;

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber at `level` (error, warn, info, debug, trace).
/// `RUST_LOG`, when set, overrides it.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
