//! Z-score signal generation over the filtered spread.
//!
//! Keeps a short and a long rolling window of spread values and maps the
//! resulting z-score to a [`Signal`] with hysteresis: entries need a wide
//! deviation, exits a narrow one, and a third, wider band stops the trade out.

use crate::config::SignalConfig;
use crate::error::{PairsError, Result};
use crate::logging::LogThrottle;
use crate::math::RollingWindow;
use crate::strategy::Signal;
use crate::types::PositionSide;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Degenerate-statistics warnings logged: first, then one per this many.
const DEGENERATE_LOG_EVERY: u64 = 100;

/// How the z-score is formed from the rolling windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ZScoreMode {
    /// `(short_mean - long_mean) / short_std`
    #[default]
    ShortVsLong,
    /// `(spread - long_mean) / long_std`
    CurrentVsRolling,
}

/// Rolling statistics for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub short_mean: f64,
    pub short_std: f64,
    pub long_mean: f64,
    pub long_std: f64,
}

/// One step's signal together with the inputs that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub timestamp: i64,
    pub spread: f64,
    pub z_score: Option<f64>,
    pub signal: Signal,
    /// Set when the rolling std dev collapsed and the step failed closed to Hold.
    pub degenerate: bool,
}

/// Stateful z-score signal generator.
///
/// Knows whether a position is open (the caller passes the side each step)
/// but nothing about sizing or capital.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: SignalConfig,
    short: RollingWindow,
    long: RollingWindow,
    degenerate_steps: u64,
    degenerate_log: LogThrottle,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            short: RollingWindow::new(config.short_window),
            long: RollingWindow::new(config.long_window),
            config,
            degenerate_steps: 0,
            degenerate_log: LogThrottle::new(DEGENERATE_LOG_EVERY),
        })
    }

    /// Feed one spread value and get the signal for this step.
    ///
    /// Returns Hold until the long window is full. A zero or near-zero
    /// standard deviation yields Hold with `degenerate` set, never a NaN.
    pub fn next(&mut self, spread: f64, timestamp: i64, side: PositionSide) -> SignalEvent {
        self.short.push(spread);
        self.long.push(spread);

        let hold = SignalEvent {
            timestamp,
            spread,
            z_score: None,
            signal: Signal::Hold,
            degenerate: false,
        };

        if !self.long.is_full() {
            return hold;
        }

        let z_score = match self.z_score(spread, timestamp) {
            Ok(z) => z,
            Err(err) => {
                self.degenerate_steps += 1;
                if self.degenerate_log.should_log() {
                    warn!(
                        error = %err,
                        total = self.degenerate_steps,
                        suppressed = self.degenerate_log.get_and_reset_suppressed_count(),
                        "Degenerate spread statistics, holding"
                    );
                }
                return SignalEvent {
                    degenerate: true,
                    ..hold
                };
            }
        };

        let signal = decide(z_score, side, &self.config);
        debug!(timestamp, spread, z_score, ?signal, %side, "Signal evaluated");

        SignalEvent {
            z_score: Some(z_score),
            signal,
            ..hold
        }
    }

    /// Current rolling statistics, once both windows hold at least two values.
    pub fn stats(&self) -> Option<RollingStats> {
        Some(RollingStats {
            short_mean: self.short.mean()?,
            short_std: self.short.std_dev()?,
            long_mean: self.long.mean()?,
            long_std: self.long.std_dev()?,
        })
    }

    fn z_score(&self, spread: f64, timestamp: i64) -> Result<f64> {
        let stats = self.stats().ok_or(PairsError::InsufficientData {
            expected: self.config.long_window,
            actual: self.long.len(),
        })?;

        let (numerator, std_dev) = match self.config.zscore_mode {
            ZScoreMode::ShortVsLong => (stats.short_mean - stats.long_mean, stats.short_std),
            ZScoreMode::CurrentVsRolling => (spread - stats.long_mean, stats.long_std),
        };

        let degenerate = || PairsError::DegenerateStatistics {
            timestamp,
            std_dev,
            min_std: self.config.min_std,
        };

        if !std_dev.is_finite() || std_dev <= self.config.min_std {
            return Err(degenerate());
        }
        let z = numerator / std_dev;
        if z.is_finite() {
            Ok(z)
        } else {
            Err(degenerate())
        }
    }

    /// Steps that failed closed because of degenerate statistics.
    pub fn degenerate_steps(&self) -> u64 {
        self.degenerate_steps
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

/// Decision rule, evaluated in priority order:
/// 1. open and |z| >= stop → StopLossExit
/// 2. open and |z| < exit → Exit
/// 3. flat and z < entry_low → EnterLongSpread
/// 4. flat and z > entry_high → EnterShortSpread
/// 5. Hold
pub fn decide(z: f64, side: PositionSide, config: &SignalConfig) -> Signal {
    match side {
        PositionSide::LongSpread | PositionSide::ShortSpread => {
            if z.abs() >= config.stop_loss_threshold {
                Signal::StopLossExit
            } else if z.abs() < config.exit_threshold {
                Signal::Exit
            } else {
                Signal::Hold
            }
        }
        PositionSide::Flat => {
            if z < config.entry_low {
                Signal::EnterLongSpread
            } else if z > config.entry_high {
                Signal::EnterShortSpread
            } else {
                Signal::Hold
            }
        }
    }
}
