//! CLI command handlers.
//!
//! This module contains the implementation for each CLI subcommand,
//! delegating to the backtest engine and the parameter optimizer.

mod backtest;
mod optimize;

pub use backtest::run_backtest;
pub use optimize::run_optimize;

use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Create `output_dir` and write `value` there as pretty JSON.
fn write_json<T: Serialize>(
    output_dir: &Path,
    file_name: &str,
    value: &T,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join(file_name);
    let mut file = File::create(&output_path)?;
    let json = serde_json::to_string_pretty(value)?;
    file.write_all(json.as_bytes())?;
    info!(path = %output_path.display(), "Results written");
    Ok(output_path)
}
