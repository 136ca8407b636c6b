use clap::Parser;
use dotenv::dotenv;
use kalman_pairs::cli::{BacktestCliConfig, Cli, Commands, DataSource, OptimizeCliConfig};
use kalman_pairs::commands::{run_backtest, run_optimize};
use kalman_pairs::logging::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables (RUST_LOG among them) from the .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.verbose);

    match cli.command {
        Commands::Backtest {
            input,
            synthetic,
            observations,
            seed,
            config,
            process_noise,
            obs_noise,
            output_dir,
            trades_csv,
        } => {
            run_backtest(BacktestCliConfig {
                source: DataSource::from_args(input, synthetic, observations, seed)?,
                pipeline_path: config,
                process_noise,
                obs_noise,
                output_dir,
                trades_csv,
            })?;
        }
        Commands::Optimize {
            input,
            synthetic,
            observations,
            data_seed,
            config,
            search_config,
            method,
            n_trials,
            seed,
            train_ratio,
            output_dir,
        } => {
            run_optimize(OptimizeCliConfig {
                source: DataSource::from_args(input, synthetic, observations, data_seed)?,
                pipeline_path: config,
                search_path: search_config,
                method,
                n_trials,
                seed,
                train_ratio,
                output_dir,
            })?;
        }
    }

    Ok(())
}
