//! Performance statistics over a finished run.
//!
//! Pure functions of the per-step return series and the trade log. Statistics
//! that cannot be computed are reported as [`Statistic::Undefined`] or
//! [`Statistic::NoTrades`] rather than as a misleading zero.

use crate::backtest::position::Trade;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// A statistic that may be unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Statistic {
    Value(f64),
    /// Not computable from the data (too few samples, zero variance)
    Undefined,
    /// The trade log is empty; every statistic of such a run is reported this way
    NoTrades,
}

impl Statistic {
    pub fn value(&self) -> Option<f64> {
        match self {
            Statistic::Value(v) => Some(*v),
            Statistic::Undefined | Statistic::NoTrades => None,
        }
    }

    fn from_finite(value: f64) -> Self {
        if value.is_finite() {
            Statistic::Value(value)
        } else {
            Statistic::Undefined
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statistic::Value(v) => write!(f, "{:.4}", v),
            Statistic::Undefined => write!(f, "undefined"),
            Statistic::NoTrades => write!(f, "no trades"),
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Annualized Sharpe ratio (risk-free rate zero)
    pub sharpe: Statistic,
    /// Largest peak-to-trough decline of compounded equity, as a positive fraction
    pub max_drawdown: Statistic,
    /// Fraction of trades with positive net P&L
    pub hit_rate: Statistic,
    pub cagr: Statistic,
    /// Annualized standard deviation of step returns
    pub volatility: Statistic,
    /// Mean net P&L per trade in USD
    pub avg_trade_pnl: Statistic,
    /// Gross profit over gross loss
    pub profit_factor: Statistic,
    pub total_pnl: Decimal,
    pub trade_count: usize,
    /// Number of returns the statistics were computed from
    pub periods: usize,
}

/// Computes a [`PerformanceReport`].
#[derive(Debug, Clone, Copy)]
pub struct PerformanceAnalyzer {
    periods_per_year: f64,
}

impl PerformanceAnalyzer {
    pub fn new(periods_per_year: f64) -> Self {
        Self { periods_per_year }
    }

    /// A run without closed trades reports [`Statistic::NoTrades`] for every
    /// statistic, the return-based ones included.
    pub fn analyze(&self, returns: &[f64], trades: &[Trade]) -> PerformanceReport {
        if trades.is_empty() {
            return PerformanceReport {
                sharpe: Statistic::NoTrades,
                max_drawdown: Statistic::NoTrades,
                hit_rate: Statistic::NoTrades,
                cagr: Statistic::NoTrades,
                volatility: Statistic::NoTrades,
                avg_trade_pnl: Statistic::NoTrades,
                profit_factor: Statistic::NoTrades,
                total_pnl: Decimal::ZERO,
                trade_count: 0,
                periods: returns.len(),
            };
        }
        let total_pnl = trades.iter().map(|t| t.realized_pnl).sum();

        PerformanceReport {
            sharpe: sharpe_ratio(returns, self.periods_per_year),
            max_drawdown: max_drawdown(returns),
            hit_rate: hit_rate(trades),
            cagr: cagr(returns, self.periods_per_year),
            volatility: volatility(returns, self.periods_per_year),
            avg_trade_pnl: avg_trade_pnl(trades),
            profit_factor: profit_factor(trades),
            total_pnl,
            trade_count: trades.len(),
            periods: returns.len(),
        }
    }
}

/// Mean and sample standard deviation (n-1), or None for fewer than 2 samples.
fn mean_std(returns: &[f64]) -> Option<(f64, f64)> {
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// `mean / std × √periods_per_year`. Undefined for < 2 samples or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> Statistic {
    match mean_std(returns) {
        Some((mean, std_dev)) if std_dev > 0.0 => {
            Statistic::from_finite(mean / std_dev * periods_per_year.sqrt())
        }
        _ => Statistic::Undefined,
    }
}

pub fn volatility(returns: &[f64], periods_per_year: f64) -> Statistic {
    match mean_std(returns) {
        Some((_, std_dev)) => Statistic::from_finite(std_dev * periods_per_year.sqrt()),
        None => Statistic::Undefined,
    }
}

/// Drawdown of the equity curve compounded from `returns`, starting at 1.
pub fn max_drawdown(returns: &[f64]) -> Statistic {
    if returns.is_empty() {
        return Statistic::Undefined;
    }
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    Statistic::from_finite(worst)
}

/// Compound annual growth rate over `returns.len() / periods_per_year` years.
pub fn cagr(returns: &[f64], periods_per_year: f64) -> Statistic {
    if returns.is_empty() {
        return Statistic::Undefined;
    }
    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    if growth <= 0.0 {
        return Statistic::Value(-1.0);
    }
    let years = returns.len() as f64 / periods_per_year;
    Statistic::from_finite(growth.powf(1.0 / years) - 1.0)
}

pub fn hit_rate(trades: &[Trade]) -> Statistic {
    if trades.is_empty() {
        return Statistic::NoTrades;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Statistic::Value(winners as f64 / trades.len() as f64)
}

fn avg_trade_pnl(trades: &[Trade]) -> Statistic {
    if trades.is_empty() {
        return Statistic::NoTrades;
    }
    let total: Decimal = trades.iter().map(|t| t.realized_pnl).sum();
    let avg = total / Decimal::from(trades.len());
    avg.to_f64().map_or(Statistic::Undefined, Statistic::from_finite)
}

fn profit_factor(trades: &[Trade]) -> Statistic {
    if trades.is_empty() {
        return Statistic::NoTrades;
    }
    let (profit, loss) = trades.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(profit, loss), t| {
            if t.realized_pnl > Decimal::ZERO {
                (profit + t.realized_pnl, loss)
            } else {
                (profit, loss - t.realized_pnl)
            }
        },
    );
    if loss.is_zero() {
        return Statistic::Undefined;
    }
    (profit / loss)
        .to_f64()
        .map_or(Statistic::Undefined, Statistic::from_finite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExitReason, PositionSide};
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn trade(pnl: Decimal) -> Trade {
        Trade {
            side: PositionSide::LongSpread,
            entry_timestamp: 0,
            exit_timestamp: 1,
            entry_price_a: dec!(100),
            entry_price_b: dec!(100),
            exit_price_a: dec!(100),
            exit_price_b: dec!(100),
            size_a: dec!(1),
            size_b: dec!(1),
            hedge_ratio: 1.0,
            gross_pnl: pnl,
            fees: Decimal::ZERO,
            realized_pnl: pnl,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn test_empty_trade_log_reports_no_trades() {
        // Returns move (an open position marked to market) but nothing closed
        let report = PerformanceAnalyzer::new(252.0).analyze(&[0.01, -0.01, 0.02], &[]);
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
        assert_eq!(report.trade_count, 0);
        assert_eq!(report.total_pnl, Decimal::ZERO);
        assert_eq!(report.periods, 3);

        let flat = PerformanceAnalyzer::new(252.0).analyze(&[0.0; 80], &[]);
        assert_eq!(flat.max_drawdown, Statistic::NoTrades);
        assert_eq!(flat.cagr, Statistic::NoTrades);
        assert_eq!(flat.volatility, Statistic::NoTrades);
    }

    #[test]
    fn test_single_losing_trade_hit_rate_zero() {
        let report = PerformanceAnalyzer::new(252.0).analyze(&[-0.01, 0.0], &[trade(dec!(-40))]);
        assert_eq!(report.hit_rate, Statistic::Value(0.0));
        assert_eq!(report.total_pnl, dec!(-40));
        assert_eq!(report.profit_factor, Statistic::Value(0.0));
    }

    #[test]
    fn test_sharpe_undefined_cases() {
        assert_eq!(sharpe_ratio(&[0.01], 252.0), Statistic::Undefined);
        assert_eq!(sharpe_ratio(&[], 252.0), Statistic::Undefined);
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01], 252.0), Statistic::Undefined);
    }

    #[test]
    fn test_sharpe_matches_formula() {
        let returns = [0.01, 0.02, 0.015, 0.018, 0.012];
        let mean = returns.iter().sum::<f64>() / 5.0;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 4.0;
        let expected = mean / var.sqrt() * 252.0_f64.sqrt();
        assert_relative_eq!(
            sharpe_ratio(&returns, 252.0).value().unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_max_drawdown_compounds() {
        // 1.0 -> 1.1 -> 0.88 -> 0.968
        let dd = max_drawdown(&[0.1, -0.2, 0.1]).value().unwrap();
        assert_relative_eq!(dd, 0.2, epsilon = 1e-12);
        assert_eq!(max_drawdown(&[0.01, 0.02]), Statistic::Value(0.0));
    }

    #[test]
    fn test_cagr_one_year() {
        let returns = vec![0.0; 251].into_iter().chain([0.1]).collect::<Vec<_>>();
        assert_relative_eq!(cagr(&returns, 252.0).value().unwrap(), 0.1, epsilon = 1e-12);
        assert_eq!(cagr(&[-1.0], 252.0), Statistic::Value(-1.0));
    }

    #[test]
    fn test_hit_rate_mixed() {
        let trades = [trade(dec!(10)), trade(dec!(-5)), trade(dec!(20)), trade(dec!(0))];
        assert_eq!(hit_rate(&trades), Statistic::Value(0.5));
        assert_eq!(profit_factor(&trades), Statistic::Value(6.0));
    }
}
