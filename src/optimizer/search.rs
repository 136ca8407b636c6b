//! Candidate proposal strategies.
//!
//! All samplers work per dimension in unit space (see [`ParamRange::to_unit`]),
//! so log-scaled noise parameters are explored evenly across decades.

use super::config::{CandidateParams, ParamRange, SearchConfig, SearchMethod, SearchSpace};
use super::objective::TrialResult;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Fraction of completed trials treated as "good" by the Parzen sampler.
const TPE_GAMMA: f64 = 0.2;
/// Draws per dimension scored by the l(x)/g(x) ratio.
const TPE_CANDIDATES: usize = 24;
/// Kernel bandwidth in unit space.
const TPE_BANDWIDTH: f64 = 0.1;

/// Proposes the next candidate given the trials completed so far.
pub trait Sampler: Send {
    fn suggest(&mut self, history: &[TrialResult], rng: &mut StdRng) -> Option<CandidateParams>;
}

/// Build the sampler for `config.method`.
pub fn sampler_for(config: &SearchConfig) -> Box<dyn Sampler> {
    match config.method {
        SearchMethod::Random => Box::new(RandomSampler::new(config.space.clone())),
        SearchMethod::Tpe => Box::new(TpeSampler::new(
            config.space.clone(),
            config.n_startup_trials,
        )),
        SearchMethod::Grid => Box::new(GridSampler::new(&config.space, config.n_trials)),
    }
}

fn sample_uniform(space: &SearchSpace, rng: &mut StdRng) -> CandidateParams {
    let values: Vec<f64> = space
        .dimensions()
        .iter()
        .map(|range| range.sample(rng))
        .collect();
    CandidateParams::from_values(space, &values)
}

/// Independent uniform draws (log-uniform for log ranges).
pub struct RandomSampler {
    space: SearchSpace,
}

impl RandomSampler {
    pub fn new(space: SearchSpace) -> Self {
        Self { space }
    }
}

impl Sampler for RandomSampler {
    fn suggest(&mut self, _history: &[TrialResult], rng: &mut StdRng) -> Option<CandidateParams> {
        Some(sample_uniform(&self.space, rng))
    }
}

/// Exhaustive cartesian grid, truncated to the trial budget.
pub struct GridSampler {
    points: std::vec::IntoIter<CandidateParams>,
}

impl GridSampler {
    /// Points per axis are the largest `k` with `k^dims <= n_trials` (at least 2).
    pub fn new(space: &SearchSpace, n_trials: usize) -> Self {
        let dims = space.dimensions();
        let per_axis = points_per_axis(n_trials, dims.len());

        let mut combos: Vec<Vec<f64>> = vec![Vec::new()];
        for range in &dims {
            let axis = range.grid(per_axis);
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    axis.iter().map(move |v| {
                        let mut next = prefix.clone();
                        next.push(*v);
                        next
                    })
                })
                .collect();
        }

        let points: Vec<CandidateParams> = combos
            .iter()
            .take(n_trials)
            .map(|values| CandidateParams::from_values(space, values))
            .collect();
        Self {
            points: points.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.points.len()
    }
}

fn points_per_axis(n_trials: usize, dims: usize) -> usize {
    let mut k = 2usize;
    while (k + 1)
        .checked_pow(dims as u32)
        .is_some_and(|total| total <= n_trials)
    {
        k += 1;
    }
    k
}

impl Sampler for GridSampler {
    fn suggest(&mut self, _history: &[TrialResult], _rng: &mut StdRng) -> Option<CandidateParams> {
        self.points.next()
    }
}

/// Tree-structured Parzen estimator.
///
/// Uniform draws for the first `n_startup` trials; afterwards completed trials
/// are split into the top `TPE_GAMMA` fraction (good) and the rest (bad), and
/// each dimension takes the draw around a good trial that maximizes l(x)/g(x).
pub struct TpeSampler {
    space: SearchSpace,
    n_startup: usize,
}

impl TpeSampler {
    pub fn new(space: SearchSpace, n_startup: usize) -> Self {
        Self { space, n_startup }
    }

    fn sample_dimension(
        &self,
        dim: usize,
        range: &ParamRange,
        good: &[&TrialResult],
        bad: &[&TrialResult],
        rng: &mut StdRng,
    ) -> f64 {
        let unit_values = |trials: &[&TrialResult]| -> Vec<f64> {
            trials
                .iter()
                .filter_map(|t| t.params.values().get(dim).copied())
                .map(|v| range.to_unit(v))
                .collect()
        };
        let good_vals = unit_values(good);
        let bad_vals = unit_values(bad);

        if good_vals.is_empty() {
            return range.sample(rng);
        }

        let mut best_val = good_vals[0];
        let mut best_ratio = f64::NEG_INFINITY;

        for _ in 0..TPE_CANDIDATES {
            let base = good_vals[rng.gen_range(0..good_vals.len())];
            let candidate = match Normal::new(base, TPE_BANDWIDTH) {
                Ok(kernel) => kernel.sample(rng).clamp(0.0, 1.0),
                Err(_) => base,
            };

            let lx = parzen_density(candidate, &good_vals);
            let gx = parzen_density(candidate, &bad_vals);
            let ratio = lx / (gx + 1e-10);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_val = candidate;
            }
        }

        range.from_unit(best_val)
    }
}

fn gaussian_pdf(x: f64, mean: f64, sigma: f64) -> f64 {
    let exponent = -0.5 * ((x - mean) / sigma).powi(2);
    (1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt())) * exponent.exp()
}

/// Mean of Gaussian kernels centred on `points`; zero for no points.
fn parzen_density(x: f64, points: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points
        .iter()
        .map(|&p| gaussian_pdf(x, p, TPE_BANDWIDTH))
        .sum::<f64>()
        / points.len() as f64
}

impl Sampler for TpeSampler {
    fn suggest(&mut self, history: &[TrialResult], rng: &mut StdRng) -> Option<CandidateParams> {
        if history.len() < self.n_startup.max(1) {
            return Some(sample_uniform(&self.space, rng));
        }

        // Best first; ties keep trial order so the split is deterministic
        let mut sorted: Vec<&TrialResult> = history.iter().collect();
        sorted.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.trial_id.cmp(&b.trial_id))
        });

        let n_good = ((history.len() as f64 * TPE_GAMMA).ceil() as usize).max(1);
        let (good, bad) = sorted.split_at(n_good.min(sorted.len()));

        let values: Vec<f64> = self
            .space
            .dimensions()
            .iter()
            .enumerate()
            .map(|(dim, range)| self.sample_dimension(dim, range, good, bad, rng))
            .collect();
        Some(CandidateParams::from_values(&self.space, &values))
    }
}
