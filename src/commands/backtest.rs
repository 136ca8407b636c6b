//! Backtest command handler.
//!
//! Implements the `backtest` subcommand: one replay of the price history
//! through the filter, signal generator and position manager.

use super::write_json;
use crate::backtest::{BacktestEngine, BacktestRun};
use crate::cli::BacktestCliConfig;
use crate::config::PipelineConfig;
use crate::logging::{CsvRecorder, MultiRecorder, TracingRecorder};

use serde::Serialize;
use tracing::info;

/// Backtest results in JSON-serializable format.
#[derive(Debug, Serialize)]
struct BacktestOutput<'a> {
    config: &'a PipelineConfig,
    observations: usize,
    #[serde(flatten)]
    run: &'a BacktestRun,
}

/// Run a backtest with the provided CLI configuration.
///
/// Writes `results.json` (config, report, trades, signals, equity curve)
/// into the output directory.
///
/// # Errors
/// Returns error if configuration, data loading or the run itself fails.
pub fn run_backtest(config: BacktestCliConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("--- Running Backtest ---");
    let pipeline = config.pipeline()?;
    info!(
        source = ?config.source,
        process_noise = pipeline.filter.process_noise,
        obs_noise = pipeline.filter.obs_noise,
        zscore_mode = ?pipeline.signal.zscore_mode,
        "Backtest configuration"
    );

    let observations = config.source.load()?;
    info!(rows = observations.len(), "Data loaded");

    let mut recorder = MultiRecorder::default();
    recorder.add(Box::new(TracingRecorder::new()));
    if let Some(path) = &config.trades_csv {
        recorder.add(Box::new(CsvRecorder::new(path.clone())));
    }

    let engine = BacktestEngine::new(pipeline.clone())?.with_recorder(Box::new(recorder));
    let run = engine.run(&observations)?;

    let report = &run.report;
    info!("--- Backtest Results ---");
    info!("Total P&L:       ${}", report.total_pnl.round_dp(2));
    info!("Sharpe:          {}", report.sharpe);
    info!("Max Drawdown:    {}", report.max_drawdown);
    info!("CAGR:            {}", report.cagr);
    info!("Hit Rate:        {}", report.hit_rate);
    info!("Profit Factor:   {}", report.profit_factor);
    info!("Total Trades:    {}", report.trade_count);
    info!("Hedge Ratio:     {:.4} -> {:.4}", run.prior_hedge_ratio, run.final_hedge_ratio);
    if run.degenerate_steps > 0 {
        info!("Degenerate Steps: {}", run.degenerate_steps);
    }
    if let Some(position) = &run.open_position {
        info!(side = %position.side, "Position still open at end of data");
    }
    info!("------------------------");

    let output = BacktestOutput {
        config: &pipeline,
        observations: observations.len(),
        run: &run,
    };
    write_json(&config.output_dir, "results.json", &output)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DataSource;
    use crate::data::SyntheticPairConfig;
    use tempfile::tempdir;

    #[test]
    fn test_writes_results_and_trades() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("trades.csv");
        let config = BacktestCliConfig {
            source: DataSource::Synthetic(SyntheticPairConfig {
                observations: 400,
                ..Default::default()
            }),
            pipeline_path: None,
            process_noise: None,
            obs_noise: None,
            output_dir: dir.path().join("out"),
            trades_csv: Some(csv_path.clone()),
        };

        run_backtest(config).unwrap();

        let text = std::fs::read_to_string(dir.path().join("out/results.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["observations"], 400);
        assert!(json["report"]["trade_count"].is_u64());
        assert!(json["config"]["filter"]["process_noise"].is_f64());

        let trades = json["trades"].as_array().unwrap().len();
        if trades > 0 {
            let csv = std::fs::read_to_string(&csv_path).unwrap();
            assert_eq!(csv.lines().count(), trades + 1);
        }
    }
}
