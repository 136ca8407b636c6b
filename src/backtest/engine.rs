//! Sequential backtest over an aligned price history.
//!
//! Per observation: filter update → spread → signal → position step. Strictly
//! in order, one thread, no look-ahead: step `t` only ever sees data up to `t`.

use crate::analytics::{PerformanceAnalyzer, PerformanceReport};
use crate::backtest::position::{Position, PositionManager, Trade};
use crate::config::PipelineConfig;
use crate::error::{PairsError, Result};
use crate::logging::TradeRecorder;
use crate::math::{ols_hedge_ratio, KalmanHedgeRatio};
use crate::strategy::signal::{SignalEvent, SignalGenerator};
use crate::strategy::validators::{CompositeValidator, ObservationValidator};
use crate::types::PriceObservation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Fewest traded steps that still yield a return series.
const MIN_TRADED_STEPS: usize = 2;

/// Equity after one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: Decimal,
}

/// Everything a completed run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    /// One event per step fed to the signal generator
    pub signals: Vec<SignalEvent>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Step returns, aligned with `equity_curve`
    pub returns: Vec<f64>,
    pub report: PerformanceReport,
    pub degenerate_steps: u64,
    /// Hedge ratio the filter started from (configured or OLS-fitted)
    pub prior_hedge_ratio: f64,
    pub final_hedge_ratio: f64,
    /// Still open at the end of the data; marked to market in the equity curve
    pub open_position: Option<Position>,
}

/// Runs one estimator → signal → position pipeline.
pub struct BacktestEngine {
    config: PipelineConfig,
    validator: CompositeValidator,
    recorder: Option<Box<dyn TradeRecorder>>,
}

impl BacktestEngine {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            validator: CompositeValidator::default(),
            recorder: None,
        })
    }

    /// Send every closed trade to `recorder` as well as the run's trade log.
    pub fn with_recorder(mut self, recorder: Box<dyn TradeRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replay `observations` and report.
    ///
    /// Leading observations are consumed by the OLS prior (`ols_window`) and
    /// then by filter warm-up (`warmup_steps`); neither is traded.
    pub fn run(&self, observations: &[PriceObservation]) -> Result<BacktestRun> {
        self.validate(observations)?;

        let filter_config = &self.config.filter;
        let consumed = filter_config.ols_window.unwrap_or(0) + filter_config.warmup_steps;
        let required = consumed + MIN_TRADED_STEPS;
        if observations.len() < required {
            return Err(PairsError::InsufficientData {
                expected: required,
                actual: observations.len(),
            });
        }

        let mut filter = KalmanHedgeRatio::from_config(filter_config)?;
        let history = match filter_config.ols_window {
            Some(window) => {
                let (fit, rest) = observations.split_at(window);
                filter = filter.with_prior(ols_hedge_ratio(fit)?)?;
                rest
            }
            None => observations,
        };
        let prior_hedge_ratio = filter.get_beta();
        info!(
            observations = observations.len(),
            prior_hedge_ratio,
            process_noise = filter_config.process_noise,
            obs_noise = filter_config.obs_noise,
            "Starting backtest"
        );

        let (warmup, traded) = history.split_at(filter_config.warmup_steps);
        for obs in warmup {
            filter.update(obs.timestamp, obs.price_a, obs.price_b)?;
        }
        debug!(
            warmed_up = filter.is_warmed_up(filter_config.warmup_steps as u64),
            hedge_ratio = filter.get_beta(),
            "Filter warm-up complete"
        );

        let mut generator = SignalGenerator::new(self.config.signal.clone())?;
        let mut positions = PositionManager::new(self.config.risk.clone())?;

        let mut signals = Vec::with_capacity(traded.len());
        let mut equity_curve = Vec::with_capacity(traded.len());
        let mut returns = Vec::with_capacity(traded.len());

        for obs in traded {
            let sample = filter.update(obs.timestamp, obs.price_a, obs.price_b)?;
            let event = generator.next(sample.spread, sample.timestamp, positions.side());
            let outcome = positions.step(event.signal, obs, sample.hedge_ratio)?;

            if let (Some(trade), Some(recorder)) = (&outcome.trade, &self.recorder) {
                if let Err(e) = recorder.record(trade) {
                    warn!(error = %e, "Trade recorder failed");
                }
            }

            signals.push(event);
            equity_curve.push(EquityPoint {
                timestamp: obs.timestamp,
                equity: outcome.equity,
            });
            returns.push(outcome.step_return);
        }

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.flush() {
                warn!(error = %e, "Trade recorder flush failed");
            }
        }

        let open_position = positions.position().cloned();
        let degenerate_steps = generator.degenerate_steps();
        let trades = positions.into_trades();
        let report =
            PerformanceAnalyzer::new(self.config.periods_per_year).analyze(&returns, &trades);

        info!(
            trades = report.trade_count,
            sharpe = %report.sharpe,
            max_drawdown = %report.max_drawdown,
            pnl = %report.total_pnl.round_dp(2),
            degenerate_steps,
            "Backtest complete"
        );

        Ok(BacktestRun {
            signals,
            trades,
            equity_curve,
            returns,
            report,
            degenerate_steps,
            prior_hedge_ratio,
            final_hedge_ratio: filter.get_beta(),
            open_position,
        })
    }

    fn validate(&self, observations: &[PriceObservation]) -> Result<()> {
        let mut previous = None;
        for obs in observations {
            self.validator.validate(obs, previous)?;
            previous = Some(obs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Statistic;
    use crate::config::{FilterConfig, SignalConfig};

    fn flat_history(n: usize) -> Vec<PriceObservation> {
        (0..n)
            .map(|i| PriceObservation::new(i as i64, 100.0, 100.0))
            .collect()
    }

    #[test]
    fn test_constant_prices_hold_and_fail_closed() {
        let engine = BacktestEngine::new(PipelineConfig::default()).unwrap();
        let run = engine.run(&flat_history(80)).unwrap();
        assert!(run.trades.is_empty());
        assert_eq!(run.signals.len(), 80);
        assert_eq!(run.returns.len(), run.equity_curve.len());
        assert!(run.degenerate_steps > 0);
        let report = &run.report;
        for stat in [
            report.sharpe,
            report.max_drawdown,
            report.hit_rate,
            report.cagr,
            report.volatility,
            report.avg_trade_pnl,
            report.profit_factor,
        ] {
            assert_eq!(stat, Statistic::NoTrades);
        }
    }

    #[test]
    fn test_rejects_out_of_order_history() {
        let engine = BacktestEngine::new(PipelineConfig::default()).unwrap();
        let mut history = flat_history(10);
        history.swap(3, 4);
        assert!(matches!(
            engine.run(&history),
            Err(PairsError::InvalidObservation { timestamp: 3, .. })
        ));
    }

    #[test]
    fn test_warmup_and_ols_consume_observations() {
        let config = PipelineConfig {
            filter: FilterConfig {
                ols_window: Some(20),
                warmup_steps: 10,
                ..Default::default()
            },
            signal: SignalConfig {
                short_window: 2,
                long_window: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        let history: Vec<PriceObservation> = (0..50)
            .map(|i| PriceObservation::new(i, 50.0, 100.0 + (i % 3) as f64 * 0.1))
            .collect();

        let run = BacktestEngine::new(config.clone()).unwrap().run(&history).unwrap();
        assert_eq!(run.signals.len(), 20);
        assert_eq!(run.signals[0].timestamp, 30);
        assert!((run.prior_hedge_ratio - 2.0).abs() < 0.01);

        assert!(matches!(
            BacktestEngine::new(config).unwrap().run(&history[..31]),
            Err(PairsError::InsufficientData { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = PipelineConfig::default();
        config.filter.obs_noise = 0.0;
        assert!(matches!(
            BacktestEngine::new(config),
            Err(PairsError::InvalidParameter { name: "obs_noise", .. })
        ));
    }
}
