//! Configuration for the parameter search.

use crate::config::PipelineConfig;
use crate::error::{PairsError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Legal range of one searched parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamRange {
    /// Linear range `[min, max]`
    Uniform { min: f64, max: f64 },
    /// Range sampled uniformly in log space; both bounds strictly positive
    LogUniform { min: f64, max: f64 },
}

impl ParamRange {
    fn bounds(&self) -> (f64, f64) {
        match *self {
            ParamRange::Uniform { min, max } | ParamRange::LogUniform { min, max } => (min, max),
        }
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        let (min, max) = self.bounds();
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(PairsError::invalid_parameter(
                name,
                format!("range [{}, {}] is not a finite, ordered interval", min, max),
            ));
        }
        if matches!(self, ParamRange::LogUniform { .. }) && min <= 0.0 {
            return Err(PairsError::invalid_parameter(
                name,
                format!("log-uniform range needs a positive lower bound, got {}", min),
            ));
        }
        Ok(())
    }

    /// Map a value into `[0, 1]` (log scale for `LogUniform`).
    pub fn to_unit(&self, value: f64) -> f64 {
        let (lo, hi, v) = match *self {
            ParamRange::Uniform { min, max } => (min, max, value),
            ParamRange::LogUniform { min, max } => (min.ln(), max.ln(), value.ln()),
        };
        if hi > lo {
            ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Inverse of [`ParamRange::to_unit`].
    pub fn from_unit(&self, unit: f64) -> f64 {
        let unit = unit.clamp(0.0, 1.0);
        match *self {
            ParamRange::Uniform { min, max } => min + unit * (max - min),
            ParamRange::LogUniform { min, max } => (min.ln() + unit * (max.ln() - min.ln()))
                .exp()
                .clamp(min, max),
        }
    }

    /// Uniformly sample a value from the range.
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        self.from_unit(rng.gen::<f64>())
    }

    /// `points` evenly spaced values (log-spaced for `LogUniform`), bounds included.
    pub fn grid(&self, points: usize) -> Vec<f64> {
        match points {
            0 => Vec::new(),
            1 => vec![self.from_unit(0.5)],
            n => (0..n)
                .map(|i| self.from_unit(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

/// Searched dimensions. Thresholds are optional; when absent the base
/// pipeline's thresholds are used unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    #[serde(default = "default_process_noise_range")]
    pub process_noise: ParamRange,
    #[serde(default = "default_obs_noise_range")]
    pub obs_noise: ParamRange,
    /// Symmetric entry threshold: enter beyond `±entry`
    #[serde(default)]
    pub entry_threshold: Option<ParamRange>,
    #[serde(default)]
    pub exit_threshold: Option<ParamRange>,
}

fn default_process_noise_range() -> ParamRange {
    ParamRange::LogUniform { min: 1e-7, max: 1e-2 }
}
fn default_obs_noise_range() -> ParamRange {
    ParamRange::LogUniform { min: 1e-5, max: 1.0 }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            process_noise: default_process_noise_range(),
            obs_noise: default_obs_noise_range(),
            entry_threshold: None,
            exit_threshold: None,
        }
    }
}

impl SearchSpace {
    /// Ranges in a fixed order: Q, R, then the optional thresholds.
    pub fn dimensions(&self) -> Vec<ParamRange> {
        let mut dims = vec![self.process_noise, self.obs_noise];
        dims.extend(self.entry_threshold);
        dims.extend(self.exit_threshold);
        dims
    }

    pub fn validate(&self) -> Result<()> {
        self.process_noise.validate("process_noise")?;
        self.obs_noise.validate("obs_noise")?;
        if let Some(range) = &self.entry_threshold {
            range.validate("entry_threshold")?;
        }
        if let Some(range) = &self.exit_threshold {
            range.validate("exit_threshold")?;
        }
        Ok(())
    }
}

/// How candidates are proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SearchMethod {
    /// Independent uniform draws
    Random,
    /// Random startup phase, then a Parzen-estimator sampler biased toward
    /// the best trials so far
    #[default]
    Tpe,
    /// Cartesian grid; `n_trials` caps the number of points evaluated
    Grid,
}

/// One candidate parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateParams {
    pub process_noise: f64,
    pub obs_noise: f64,
    pub entry_threshold: Option<f64>,
    pub exit_threshold: Option<f64>,
}

impl CandidateParams {
    /// Build from values ordered like [`SearchSpace::dimensions`].
    pub fn from_values(space: &SearchSpace, values: &[f64]) -> Self {
        let mut rest = values.iter().copied().skip(2);
        Self {
            process_noise: values.first().copied().unwrap_or(f64::NAN),
            obs_noise: values.get(1).copied().unwrap_or(f64::NAN),
            entry_threshold: space.entry_threshold.and_then(|_| rest.next()),
            exit_threshold: space.exit_threshold.and_then(|_| rest.next()),
        }
    }

    /// Values ordered like [`SearchSpace::dimensions`].
    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![self.process_noise, self.obs_noise];
        values.extend(self.entry_threshold);
        values.extend(self.exit_threshold);
        values
    }

    /// The base pipeline with this candidate's parameters applied.
    pub fn apply(&self, base: &PipelineConfig) -> PipelineConfig {
        let mut config = base.with_noise(self.process_noise, self.obs_noise);
        if let Some(entry) = self.entry_threshold {
            config.signal.entry_low = -entry;
            config.signal.entry_high = entry;
        }
        if let Some(exit) = self.exit_threshold {
            config.signal.exit_threshold = exit;
        }
        config
    }
}

/// Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub space: SearchSpace,
    #[serde(default)]
    pub method: SearchMethod,
    #[serde(default = "default_n_trials")]
    pub n_trials: usize,
    /// Random trials before the Parzen sampler takes over
    #[serde(default = "default_n_startup_trials")]
    pub n_startup_trials: usize,
    /// Trials evaluated in parallel per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Candidates with fewer closed trades are never selected as best
    #[serde(default)]
    pub min_trades: usize,
    /// Optimize on this leading fraction of the history and validate on the rest
    #[serde(default)]
    pub train_ratio: Option<f64>,
}

fn default_n_trials() -> usize {
    100
}
fn default_n_startup_trials() -> usize {
    10
}
fn default_batch_size() -> usize {
    8
}
fn default_seed() -> u64 {
    42
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            method: SearchMethod::default(),
            n_trials: default_n_trials(),
            n_startup_trials: default_n_startup_trials(),
            batch_size: default_batch_size(),
            seed: default_seed(),
            min_trades: 0,
            train_ratio: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        self.space.validate()?;
        if self.n_trials == 0 {
            return Err(PairsError::invalid_parameter(
                "n_trials",
                "must be at least 1",
            ));
        }
        if self.batch_size == 0 {
            return Err(PairsError::invalid_parameter(
                "batch_size",
                "must be at least 1",
            ));
        }
        if let Some(ratio) = self.train_ratio {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(PairsError::invalid_parameter(
                    "train_ratio",
                    format!("must be in (0, 1), got {}", ratio),
                ));
            }
        }
        Ok(())
    }
}
