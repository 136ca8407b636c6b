//! CLI configuration structs bridging CLI arguments to domain types.
//!
//! These structs decouple the CLI parsing layer from the business logic,
//! allowing command handlers to work with validated, typed configurations.

use crate::config::PipelineConfig;
use crate::data::{self, DataError, SyntheticPairConfig};
use crate::error::PairsError;
use crate::optimizer::{SearchConfig, SearchMethod};
use crate::types::PriceObservation;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when assembling a run from CLI arguments and files.
#[derive(Debug, Error)]
pub enum CliConfigError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Pipeline(#[from] PairsError),

    #[error("Unknown search method: '{0}'. Use 'random', 'tpe' or 'grid'")]
    UnknownMethod(String),

    #[error("No price source: pass --input <FILE> or --synthetic")]
    MissingSource,
}

impl std::str::FromStr for SearchMethod {
    type Err = CliConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "tpe" | "bayesian" => Ok(Self::Tpe),
            "grid" => Ok(Self::Grid),
            _ => Err(CliConfigError::UnknownMethod(s.to_string())),
        }
    }
}

/// Where the price history comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// JSON array of observations
    File(PathBuf),
    Synthetic(SyntheticPairConfig),
}

impl DataSource {
    /// `--input` wins over `--synthetic`; neither is an error.
    pub fn from_args(
        input: Option<PathBuf>,
        synthetic: bool,
        observations: usize,
        seed: u64,
    ) -> Result<Self, CliConfigError> {
        match (input, synthetic) {
            (Some(path), _) => Ok(Self::File(path)),
            (None, true) => Ok(Self::Synthetic(SyntheticPairConfig {
                observations,
                seed,
                ..Default::default()
            })),
            (None, false) => Err(CliConfigError::MissingSource),
        }
    }

    pub fn load(&self) -> Result<Vec<PriceObservation>, CliConfigError> {
        match self {
            Self::File(path) => Ok(data::load_json(path)?),
            Self::Synthetic(config) => Ok(data::generate(config)?),
        }
    }
}

/// Read and deserialize a JSON file.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, CliConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Pipeline from `--config` (or defaults) with command-line noise overrides applied.
fn load_pipeline(
    path: Option<&Path>,
    process_noise: Option<f64>,
    obs_noise: Option<f64>,
) -> Result<PipelineConfig, CliConfigError> {
    let mut config: PipelineConfig = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading pipeline config");
            load_json_file(path)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(q) = process_noise {
        config.filter.process_noise = q;
    }
    if let Some(r) = obs_noise {
        config.filter.obs_noise = r;
    }
    config.validate()?;
    Ok(config)
}

/// CLI configuration for a single backtest.
#[derive(Debug, Clone)]
pub struct BacktestCliConfig {
    pub source: DataSource,
    pub pipeline_path: Option<PathBuf>,
    pub process_noise: Option<f64>,
    pub obs_noise: Option<f64>,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Also append closed trades to this CSV file
    pub trades_csv: Option<PathBuf>,
}

impl BacktestCliConfig {
    pub fn pipeline(&self) -> Result<PipelineConfig, CliConfigError> {
        load_pipeline(
            self.pipeline_path.as_deref(),
            self.process_noise,
            self.obs_noise,
        )
    }
}

/// CLI configuration for a parameter search.
#[derive(Debug, Clone)]
pub struct OptimizeCliConfig {
    pub source: DataSource,
    pub pipeline_path: Option<PathBuf>,
    pub search_path: Option<PathBuf>,
    pub method: Option<String>,
    pub n_trials: Option<usize>,
    pub seed: Option<u64>,
    pub train_ratio: Option<f64>,
    pub output_dir: PathBuf,
}

impl OptimizeCliConfig {
    pub fn pipeline(&self) -> Result<PipelineConfig, CliConfigError> {
        load_pipeline(self.pipeline_path.as_deref(), None, None)
    }

    /// Search config from `--search-config` (or defaults) with flag overrides.
    pub fn search(&self) -> Result<SearchConfig, CliConfigError> {
        let mut config: SearchConfig = match &self.search_path {
            Some(path) => load_json_file(path)?,
            None => SearchConfig::default(),
        };
        if let Some(method) = &self.method {
            config.method = method.parse()?;
        }
        if let Some(n) = self.n_trials {
            config.n_trials = n;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.train_ratio.is_some() {
            config.train_ratio = self.train_ratio;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn optimize_config() -> OptimizeCliConfig {
        OptimizeCliConfig {
            source: DataSource::Synthetic(SyntheticPairConfig::default()),
            pipeline_path: None,
            search_path: None,
            method: None,
            n_trials: None,
            seed: None,
            train_ratio: None,
            output_dir: PathBuf::from("optimize_results"),
        }
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("TPE".parse::<SearchMethod>().unwrap(), SearchMethod::Tpe);
        assert_eq!("grid".parse::<SearchMethod>().unwrap(), SearchMethod::Grid);
        assert!(matches!(
            "annealing".parse::<SearchMethod>(),
            Err(CliConfigError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_source_requires_input_or_synthetic() {
        assert!(matches!(
            DataSource::from_args(None, false, 100, 1),
            Err(CliConfigError::MissingSource)
        ));
        assert!(matches!(
            DataSource::from_args(Some(PathBuf::from("p.json")), true, 100, 1),
            Ok(DataSource::File(_))
        ));
    }

    #[test]
    fn test_search_overrides_file_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"n_trials": 50, "method": "Random", "seed": 9}}"#).unwrap();

        let config = OptimizeCliConfig {
            search_path: Some(file.path().to_path_buf()),
            n_trials: Some(20),
            ..optimize_config()
        };
        let search = config.search().unwrap();
        assert_eq!(search.n_trials, 20);
        assert_eq!(search.method, SearchMethod::Random);
        assert_eq!(search.seed, 9);
    }

    #[test]
    fn test_pipeline_overrides_are_validated() {
        let config = BacktestCliConfig {
            source: DataSource::Synthetic(SyntheticPairConfig::default()),
            pipeline_path: None,
            process_noise: Some(-1.0),
            obs_noise: None,
            output_dir: PathBuf::from("backtest_results"),
            trades_csv: None,
        };
        assert!(matches!(
            config.pipeline(),
            Err(CliConfigError::Pipeline(PairsError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn test_bad_json_names_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_json_file::<PipelineConfig>(file.path()).unwrap_err();
        assert!(matches!(err, CliConfigError::Json { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
