//! CLI argument parsing using clap.
//!
//! This module defines the command-line interface for kalman-pairs,
//! including all subcommands and their arguments.

mod config;

pub use config::{
    load_json_file, BacktestCliConfig, CliConfigError, DataSource, OptimizeCliConfig,
};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kalman-pairs - Kalman-filtered pairs trading backtester
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub verbose: String,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run one backtest of the filter → signal → position pipeline
    Backtest {
        /// JSON price file: array of {timestamp, price_a, price_b}
        #[arg(long)]
        input: Option<PathBuf>,
        /// Use a seeded synthetic cointegrated pair instead of a file
        #[arg(long, default_value_t = false)]
        synthetic: bool,
        /// Number of synthetic observations
        #[arg(long, default_value_t = 1000)]
        observations: usize,
        /// Seed for synthetic data
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Pipeline configuration JSON (defaults apply to missing fields)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the process noise Q
        #[arg(long)]
        process_noise: Option<f64>,
        /// Override the observation noise R
        #[arg(long)]
        obs_noise: Option<f64>,
        /// Output directory for results
        #[arg(long, default_value = "backtest_results")]
        output_dir: PathBuf,
        /// Append closed trades to this CSV file
        #[arg(long)]
        trades_csv: Option<PathBuf>,
    },

    /// Search filter noise parameters (and optionally thresholds) for the best Sharpe ratio
    Optimize {
        /// JSON price file: array of {timestamp, price_a, price_b}
        #[arg(long)]
        input: Option<PathBuf>,
        /// Use a seeded synthetic cointegrated pair instead of a file
        #[arg(long, default_value_t = false)]
        synthetic: bool,
        /// Number of synthetic observations
        #[arg(long, default_value_t = 1000)]
        observations: usize,
        /// Seed for synthetic data
        #[arg(long, default_value_t = 42)]
        data_seed: u64,
        /// Base pipeline configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
        /// Search configuration JSON
        #[arg(long)]
        search_config: Option<PathBuf>,
        /// Search method: 'random', 'tpe' or 'grid'
        #[arg(long)]
        method: Option<String>,
        /// Number of trials
        #[arg(long)]
        n_trials: Option<usize>,
        /// Seed for candidate sampling
        #[arg(long)]
        seed: Option<u64>,
        /// Optimize on this leading fraction and validate on the rest
        #[arg(long)]
        train_ratio: Option<f64>,
        /// Output directory for results
        #[arg(long, default_value = "optimize_results")]
        output_dir: PathBuf,
    },
}
