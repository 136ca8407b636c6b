//! Kalman-filtered pairs trading.
//!
//! A scalar Kalman filter tracks the hedge ratio between two co-moving
//! instruments. The filtered spread drives a z-score signal, a position
//! state machine turns signals into dual-leg trades with a z-score and a
//! dollar stop-loss, and a parallel optimizer searches the filter noise
//! parameters for the best Sharpe ratio.

pub mod analytics;
pub mod backtest;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod math;
pub mod optimizer;
pub mod strategy;
pub mod types;

pub use error::{PairsError, Result};
