//! Backtesting engine for the pairs strategy.
//!
//! - [`position`]: single-position state machine, sizing, fees, dual stop
//! - [`engine`]: replays a price history through filter, signal and position layers

pub mod engine;
pub mod position;

pub use engine::{BacktestEngine, BacktestRun, EquityPoint};
pub use position::{Position, PositionManager, SizingMode, StepOutcome, Trade};
