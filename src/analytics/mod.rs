//! Post-run analytics.

pub mod performance;

pub use performance::{PerformanceAnalyzer, PerformanceReport, Statistic};
