//! Configuration for one backtest pipeline run.
//!
//! Every field has a serde default so a partial JSON file is enough, and every
//! section is validated before any component is constructed: bad parameters
//! are rejected up front, never mid-run.

use crate::backtest::position::SizingMode;
use crate::error::{PairsError, Result};
use crate::strategy::exit_policy::StopPolicy;
use crate::strategy::signal::ZScoreMode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Trading days per year for annualizing daily-bar statistics.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Kalman filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Prior hedge ratio. Ignored when `ols_window` is set.
    #[serde(default = "default_initial_hedge_ratio")]
    pub initial_hedge_ratio: f64,

    /// Prior state covariance (P0)
    #[serde(default = "default_initial_covariance")]
    pub initial_covariance: f64,

    /// Process noise Q - how fast the hedge ratio may drift
    #[serde(default = "default_process_noise")]
    pub process_noise: f64,

    /// Observation noise R - measurement uncertainty
    #[serde(default = "default_obs_noise")]
    pub obs_noise: f64,

    /// Fit the prior hedge ratio by OLS over this many leading observations.
    /// Those observations are consumed by the fit and never traded.
    #[serde(default)]
    pub ols_window: Option<usize>,

    /// Filter updates to run before the spread is handed to the signal layer.
    #[serde(default)]
    pub warmup_steps: usize,

    /// Optional symmetric bound on the hedge ratio estimate.
    #[serde(default)]
    pub max_abs_hedge_ratio: Option<f64>,
}

fn default_initial_hedge_ratio() -> f64 {
    1.0
}
fn default_initial_covariance() -> f64 {
    1.0
}
fn default_process_noise() -> f64 {
    1e-5
}
fn default_obs_noise() -> f64 {
    1e-3
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            initial_hedge_ratio: default_initial_hedge_ratio(),
            initial_covariance: default_initial_covariance(),
            process_noise: default_process_noise(),
            obs_noise: default_obs_noise(),
            ols_window: None,
            warmup_steps: 0,
            max_abs_hedge_ratio: None,
        }
    }
}

impl FilterConfig {
    pub fn with_noise(process_noise: f64, obs_noise: f64) -> Self {
        Self {
            process_noise,
            obs_noise,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        positive_finite("process_noise", self.process_noise)?;
        positive_finite("obs_noise", self.obs_noise)?;
        if !self.initial_covariance.is_finite() || self.initial_covariance < 0.0 {
            return Err(PairsError::invalid_parameter(
                "initial_covariance",
                format!("must be finite and non-negative, got {}", self.initial_covariance),
            ));
        }
        if !self.initial_hedge_ratio.is_finite() {
            return Err(PairsError::invalid_parameter(
                "initial_hedge_ratio",
                format!("must be finite, got {}", self.initial_hedge_ratio),
            ));
        }
        if let Some(window) = self.ols_window {
            if window < 2 {
                return Err(PairsError::invalid_parameter(
                    "ols_window",
                    format!("needs at least 2 observations, got {}", window),
                ));
            }
        }
        if let Some(bound) = self.max_abs_hedge_ratio {
            positive_finite("max_abs_hedge_ratio", bound)?;
        }
        Ok(())
    }
}

/// Rolling z-score windows and decision thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    #[serde(default = "default_long_window")]
    pub long_window: usize,

    #[serde(default)]
    pub zscore_mode: ZScoreMode,

    /// Enter long spread when z falls below this (negative)
    #[serde(default = "default_entry_low")]
    pub entry_low: f64,

    /// Enter short spread when z rises above this (positive)
    #[serde(default = "default_entry_high")]
    pub entry_high: f64,

    /// Exit when |z| drops below this
    #[serde(default = "default_exit_threshold")]
    pub exit_threshold: f64,

    /// Stop out when |z| reaches this
    #[serde(default = "default_stop_loss_threshold")]
    pub stop_loss_threshold: f64,

    /// Standard deviations at or below this are treated as degenerate
    #[serde(default = "default_min_std")]
    pub min_std: f64,
}

fn default_short_window() -> usize {
    10
}
fn default_long_window() -> usize {
    60
}
fn default_entry_low() -> f64 {
    -1.25
}
fn default_entry_high() -> f64 {
    1.25
}
fn default_exit_threshold() -> f64 {
    0.5
}
fn default_stop_loss_threshold() -> f64 {
    3.0
}
fn default_min_std() -> f64 {
    1e-12
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
            zscore_mode: ZScoreMode::default(),
            entry_low: default_entry_low(),
            entry_high: default_entry_high(),
            exit_threshold: default_exit_threshold(),
            stop_loss_threshold: default_stop_loss_threshold(),
            min_std: default_min_std(),
        }
    }
}

impl SignalConfig {
    /// Symmetric thresholds: enter at `±entry`, exit inside `±exit`.
    pub fn with_thresholds(entry: f64, exit: f64, stop: f64) -> Self {
        Self {
            entry_low: -entry,
            entry_high: entry,
            exit_threshold: exit,
            stop_loss_threshold: stop,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.short_window < 2 {
            return Err(PairsError::invalid_parameter(
                "short_window",
                format!("must be at least 2 to define a std dev, got {}", self.short_window),
            ));
        }
        if self.long_window < self.short_window {
            return Err(PairsError::invalid_parameter(
                "long_window",
                format!(
                    "must be >= short_window ({}), got {}",
                    self.short_window, self.long_window
                ),
            ));
        }
        for (name, value) in [
            ("entry_low", self.entry_low),
            ("entry_high", self.entry_high),
            ("exit_threshold", self.exit_threshold),
            ("stop_loss_threshold", self.stop_loss_threshold),
            ("min_std", self.min_std),
        ] {
            if !value.is_finite() {
                return Err(PairsError::invalid_parameter(
                    name,
                    format!("must be finite, got {}", value),
                ));
            }
        }
        if self.exit_threshold < 0.0 {
            return Err(PairsError::invalid_parameter(
                "exit_threshold",
                format!("must be non-negative, got {}", self.exit_threshold),
            ));
        }
        if self.entry_high <= self.exit_threshold {
            return Err(PairsError::invalid_parameter(
                "entry_high",
                format!(
                    "must exceed exit_threshold ({}), got {}",
                    self.exit_threshold, self.entry_high
                ),
            ));
        }
        if self.entry_low >= -self.exit_threshold {
            return Err(PairsError::invalid_parameter(
                "entry_low",
                format!(
                    "must be below -exit_threshold ({}), got {}",
                    -self.exit_threshold, self.entry_low
                ),
            ));
        }
        // Entering beyond the stop would stop out on the next step.
        let widest_entry = self.entry_high.max(-self.entry_low);
        if self.stop_loss_threshold <= widest_entry {
            return Err(PairsError::invalid_parameter(
                "stop_loss_threshold",
                format!(
                    "must exceed the widest entry threshold ({}), got {}",
                    widest_entry, self.stop_loss_threshold
                ),
            ));
        }
        if self.min_std < 0.0 {
            return Err(PairsError::invalid_parameter(
                "min_std",
                format!("must be non-negative, got {}", self.min_std),
            ));
        }
        Ok(())
    }
}

/// Capital allocation, costs and the dollar stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Account equity the return series is measured against
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// Gross capital committed to one position across both legs
    #[serde(default = "default_allocation")]
    pub allocation: Decimal,

    /// Loss in USD that forces a stop-loss exit
    #[serde(default = "default_dollar_stop")]
    pub dollar_stop: Decimal,

    /// Taker fee in basis points of traded notional, charged per leg
    #[serde(default)]
    pub taker_fee_bps: Decimal,

    #[serde(default)]
    pub sizing: SizingMode,

    #[serde(default)]
    pub stop_policy: StopPolicy,
}

fn default_initial_capital() -> Decimal {
    dec!(100_000)
}
fn default_allocation() -> Decimal {
    dec!(25_000)
}
fn default_dollar_stop() -> Decimal {
    dec!(500)
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            allocation: default_allocation(),
            dollar_stop: default_dollar_stop(),
            taker_fee_bps: Decimal::ZERO,
            sizing: SizingMode::default(),
            stop_policy: StopPolicy::default(),
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(PairsError::invalid_parameter(
                "initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        if self.allocation <= Decimal::ZERO {
            return Err(PairsError::invalid_parameter(
                "allocation",
                format!("must be positive, got {}", self.allocation),
            ));
        }
        if self.dollar_stop <= Decimal::ZERO {
            return Err(PairsError::invalid_parameter(
                "dollar_stop",
                format!("must be positive, got {}", self.dollar_stop),
            ));
        }
        if self.taker_fee_bps < Decimal::ZERO {
            return Err(PairsError::invalid_parameter(
                "taker_fee_bps",
                format!("cannot be negative, got {}", self.taker_fee_bps),
            ));
        }
        Ok(())
    }
}

/// Full configuration of one estimator → signal → backtest pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
}

fn default_periods_per_year() -> f64 {
    DEFAULT_PERIODS_PER_YEAR
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            signal: SignalConfig::default(),
            risk: RiskConfig::default(),
            periods_per_year: default_periods_per_year(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.signal.validate()?;
        self.risk.validate()?;
        positive_finite("periods_per_year", self.periods_per_year)
    }

    /// Copy of this config with different filter noise parameters.
    pub fn with_noise(&self, process_noise: f64, obs_noise: f64) -> Self {
        let mut config = self.clone();
        config.filter.process_noise = process_noise;
        config.filter.obs_noise = obs_noise;
        config
    }
}

fn positive_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PairsError::invalid_parameter(
            name,
            format!("must be positive and finite, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.periods_per_year, DEFAULT_PERIODS_PER_YEAR);
    }

    #[test]
    fn test_zero_obs_noise_rejected() {
        let config = FilterConfig::with_noise(1e-5, 0.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            PairsError::InvalidParameter { name: "obs_noise", .. }
        ));
    }

    #[test]
    fn test_negative_process_noise_rejected() {
        let config = FilterConfig::with_noise(-1e-5, 1e-3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exit_above_entry_rejected() {
        let config = SignalConfig::with_thresholds(1.0, 1.5, 3.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            PairsError::InvalidParameter { name: "entry_high", .. }
        ));
    }

    #[test]
    fn test_stop_inside_entry_rejected() {
        let config = SignalConfig::with_thresholds(2.0, 0.5, 1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_ordering() {
        let config = SignalConfig {
            short_window: 30,
            long_window: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "filter": { "process_noise": 0.0001 }, "risk": { "dollar_stop": "250" } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.filter.process_noise, 1e-4);
        assert_eq!(config.filter.obs_noise, 1e-3);
        assert_eq!(config.risk.dollar_stop, dec!(250));
        assert_eq!(config.risk.allocation, dec!(25_000));
        assert_eq!(config.periods_per_year, DEFAULT_PERIODS_PER_YEAR);
        assert!(config.validate().is_ok());
    }
}
