//! Mathematical utilities for the pairs pipeline.
//!
//! This module provides the statistical primitives used by the strategy:
//! Kalman filtering for dynamic hedge ratio estimation, an OLS prior and
//! rolling window statistics for z-scores.

pub mod kalman;
pub mod regression;
pub mod rolling;

pub use kalman::{FilterState, KalmanHedgeRatio};
pub use regression::ols_hedge_ratio;
pub use rolling::RollingWindow;
