//! Kalman Filter for dynamic hedge ratio estimation.
//!
//! Implements a 1D Kalman Filter that tracks the hedge ratio (beta) between
//! two assets and emits the filtered spread for each observation pair.
//!
//! # Mathematical Model
//!
//! **State equation** (random walk):
//! ```text
//! β[t] = β[t-1] + w,  where w ~ N(0, Q)
//! ```
//!
//! **Observation equation**:
//! ```text
//! y[t] = β[t] * x[t] + v,  where v ~ N(0, R)
//! ```
//!
//! Where:
//! - `y[t]` is the dependent asset price (leg B)
//! - `x[t]` is the independent asset price (leg A)
//! - `β[t]` is the hedge ratio we're estimating
//! - `Q` is process noise (how fast beta drifts)
//! - `R` is observation noise (measurement uncertainty)
//!
//! # Usage
//!
//! ```rust
//! use kalman_pairs::math::KalmanHedgeRatio;
//!
//! let mut kalman = KalmanHedgeRatio::new(1.0, 1e-5, 1e-3).unwrap();
//!
//! // Update with each new price pair
//! let sample = kalman.update(0, 100.0, 98.5).unwrap(); // x=100, y=98.5
//! println!("hedge ratio {} spread {}", sample.hedge_ratio, sample.spread);
//! ```
//!
//! # References
//!
//! - Chan, E. (2013). "Algorithmic Trading: Winning Strategies and Their Rationale"

use crate::config::FilterConfig;
use crate::error::{PairsError, Result};
use crate::types::SpreadSample;

/// Snapshot of the filter's belief after the latest update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    /// Current hedge ratio estimate (β)
    pub hedge_ratio: f64,
    /// Posterior state covariance (P)
    pub covariance: f64,
    /// Covariance after the predict step of the latest update (P⁻)
    pub predicted_covariance: f64,
    /// Latest prediction error `y - β⁻ x`
    pub last_innovation: Option<f64>,
    /// Latest innovation variance `x² P⁻ + R`
    pub last_innovation_variance: Option<f64>,
    pub update_count: u64,
}

/// Kalman Filter for estimating dynamic hedge ratios.
///
/// One instance per run; the belief is only ever mutated by [`update`].
///
/// # Performance
///
/// - O(1) per update (constant time, no historical data storage)
///
/// [`update`]: KalmanHedgeRatio::update
#[derive(Debug, Clone)]
pub struct KalmanHedgeRatio {
    /// Current hedge ratio estimate (β)
    beta: f64,
    /// State estimation error covariance (P)
    variance: f64,
    /// P⁻ from the latest predict step
    predicted_variance: f64,
    /// Process noise covariance (Q) - controls how fast β can drift
    /// Higher Q = faster adaptation but more noise sensitivity
    process_noise: f64,
    /// Observation noise covariance (R) - measurement uncertainty
    /// Higher R = smoother estimates but slower adaptation
    obs_noise: f64,
    initial_beta: f64,
    initial_variance: f64,
    max_abs_beta: Option<f64>,
    last_innovation: Option<f64>,
    last_innovation_variance: Option<f64>,
    /// Number of updates received (for diagnostics)
    update_count: u64,
}

impl KalmanHedgeRatio {
    /// Create a new Kalman Filter for hedge ratio estimation.
    ///
    /// # Arguments
    ///
    /// * `initial_beta` - Starting hedge ratio estimate. Use 1.0 for equal-weight
    ///   or pre-compute from historical OLS regression.
    /// * `process_noise` - Q parameter. Typical range: 1e-6 to 1e-4.
    /// * `obs_noise` - R parameter. Typical range: 1e-4 to 1e-2.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if Q or R is not strictly positive and finite.
    pub fn new(initial_beta: f64, process_noise: f64, obs_noise: f64) -> Result<Self> {
        Self::from_config(&FilterConfig {
            initial_hedge_ratio: initial_beta,
            process_noise,
            obs_noise,
            ..Default::default()
        })
    }

    /// Build a filter from a validated [`FilterConfig`].
    ///
    /// `ols_window` is not applied here; the engine fits the prior and passes
    /// it through [`KalmanHedgeRatio::with_prior`].
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            beta: config.initial_hedge_ratio,
            variance: config.initial_covariance,
            predicted_variance: config.initial_covariance,
            process_noise: config.process_noise,
            obs_noise: config.obs_noise,
            initial_beta: config.initial_hedge_ratio,
            initial_variance: config.initial_covariance,
            max_abs_beta: config.max_abs_hedge_ratio,
            last_innovation: None,
            last_innovation_variance: None,
            update_count: 0,
        })
    }

    /// Replace the prior hedge ratio (e.g. with an OLS estimate) before the first update.
    pub fn with_prior(mut self, beta: f64) -> Result<Self> {
        if !beta.is_finite() {
            return Err(PairsError::invalid_parameter(
                "initial_hedge_ratio",
                format!("prior must be finite, got {}", beta),
            ));
        }
        self.beta = self.clamp(beta);
        self.initial_beta = self.beta;
        Ok(self)
    }

    /// Update the hedge ratio estimate with a new price observation.
    ///
    /// Runs the predict and correct steps, then computes the spread from the
    /// post-correction hedge ratio and the current prices.
    ///
    /// # Arguments
    ///
    /// * `timestamp` - Tag for the returned sample
    /// * `x` - Independent variable (leg A price)
    /// * `y` - Dependent variable (leg B price)
    ///
    /// # Errors
    ///
    /// - `InvalidObservation` for non-finite or non-positive prices; the
    ///   belief is left untouched.
    /// - `InvalidParameter` if the innovation variance is not strictly positive.
    pub fn update(&mut self, timestamp: i64, x: f64, y: f64) -> Result<SpreadSample> {
        if !x.is_finite() || !y.is_finite() || x <= 0.0 || y <= 0.0 {
            return Err(PairsError::invalid_observation(
                timestamp,
                format!("prices must be positive and finite, got a={} b={}", x, y),
            ));
        }

        // === PREDICT STEP ===
        // β stays the same (random walk); uncertainty grows by Q.
        let p_predicted = self.variance + self.process_noise;

        // === UPDATE STEP ===
        // Observation matrix H = x (since y = β * x)
        let innovation = y - self.beta * x;

        // Innovation covariance: S = H * P * H' + R = x² * P + R
        let s = x * x * p_predicted + self.obs_noise;
        if !s.is_finite() || s <= 0.0 {
            return Err(PairsError::invalid_parameter(
                "obs_noise",
                format!("innovation variance must be positive and finite, got {}", s),
            ));
        }

        // Kalman gain: K = P * H' * S^(-1) = P * x / S
        let kalman_gain = p_predicted * x / s;

        self.beta = self.clamp(self.beta + kalman_gain * innovation);

        // P = (1 - K x) P⁻ = P⁻ R / S. R <= S keeps this in [0, P⁻].
        self.variance = p_predicted * (self.obs_noise / s);
        self.predicted_variance = p_predicted;
        self.last_innovation = Some(innovation);
        self.last_innovation_variance = Some(s);
        self.update_count += 1;

        Ok(SpreadSample {
            timestamp,
            hedge_ratio: self.beta,
            spread: y - self.beta * x,
        })
    }

    fn clamp(&self, beta: f64) -> f64 {
        match self.max_abs_beta {
            Some(bound) => beta.clamp(-bound, bound),
            None => beta,
        }
    }

    /// Get the current hedge ratio estimate.
    #[inline]
    pub fn get_beta(&self) -> f64 {
        self.beta
    }

    /// Get the current estimation uncertainty (variance).
    ///
    /// Lower values indicate higher confidence in the estimate.
    #[inline]
    pub fn get_variance(&self) -> f64 {
        self.variance
    }

    /// Get the number of updates processed.
    #[inline]
    pub fn get_update_count(&self) -> u64 {
        self.update_count
    }

    pub fn state(&self) -> FilterState {
        FilterState {
            hedge_ratio: self.beta,
            covariance: self.variance,
            predicted_covariance: self.predicted_variance,
            last_innovation: self.last_innovation,
            last_innovation_variance: self.last_innovation_variance,
            update_count: self.update_count,
        }
    }

    /// Check if the filter has received enough updates to be considered "warm".
    pub fn is_warmed_up(&self, min_updates: u64) -> bool {
        self.update_count >= min_updates
    }

    /// Reset the filter to its initial prior.
    pub fn reset(&mut self) {
        self.beta = self.initial_beta;
        self.variance = self.initial_variance;
        self.predicted_variance = self.initial_variance;
        self.last_innovation = None;
        self.last_innovation_variance = None;
        self.update_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kalman_converges_to_true_beta() {
        // Simulate: y = 0.8 * x + noise
        let true_beta = 0.8;
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-5, 1e-3).unwrap(); // Start at wrong value

        for i in 0..1000 {
            let x = 100.0 + (i as f64 * 0.1); // Slowly rising x
            let noise = ((i * 17) % 11) as f64 / 100.0 - 0.05; // Deterministic pseudo-noise
            let y = true_beta * x + noise;
            kalman.update(i, x, y).unwrap();
        }

        let estimated_beta = kalman.get_beta();
        assert!(
            (estimated_beta - true_beta).abs() < 0.05,
            "Kalman should converge to true beta. Expected ~{}, got {}",
            true_beta,
            estimated_beta
        );
    }

    #[test]
    fn test_kalman_tracks_drifting_beta() {
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-4, 1e-3).unwrap(); // Higher Q for faster tracking

        // First regime: beta = 1.0
        for i in 0..500 {
            let x = 100.0 + (i as f64 * 0.01);
            kalman.update(i, x, x).unwrap();
        }
        assert!(
            (kalman.get_beta() - 1.0).abs() < 0.1,
            "Should track beta=1.0, got {}",
            kalman.get_beta()
        );

        // Second regime: beta = 1.5 (sudden shift)
        for i in 0..500 {
            let x = 100.0 + (i as f64 * 0.01);
            kalman.update(500 + i, x, 1.5 * x).unwrap();
        }
        assert!(
            (kalman.get_beta() - 1.5).abs() < 0.1,
            "Should adapt to beta=1.5, got {}",
            kalman.get_beta()
        );
    }

    #[test]
    fn test_zero_noise_rejected() {
        let err = KalmanHedgeRatio::new(1.0, 1e-5, 0.0).unwrap_err();
        assert!(matches!(err, PairsError::InvalidParameter { name: "obs_noise", .. }));

        let err = KalmanHedgeRatio::new(1.0, 0.0, 1e-3).unwrap_err();
        assert!(matches!(err, PairsError::InvalidParameter { name: "process_noise", .. }));
    }

    #[test]
    fn test_invalid_prices_leave_state_untouched() {
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-5, 1e-3).unwrap();
        let before = kalman.state();

        for (x, y) in [
            (0.0, 100.0),
            (f64::NAN, 100.0),
            (100.0, f64::INFINITY),
            (-5.0, 100.0),
        ] {
            let err = kalman.update(42, x, y).unwrap_err();
            assert!(matches!(err, PairsError::InvalidObservation { timestamp: 42, .. }));
        }
        assert_eq!(kalman.state(), before);
    }

    #[test]
    fn test_spread_uses_post_correction_beta() {
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-5, 1e-3).unwrap();
        let sample = kalman.update(7, 50.0, 60.0).unwrap();
        assert_eq!(sample.timestamp, 7);
        assert_eq!(sample.hedge_ratio, kalman.get_beta());
        assert_eq!(sample.spread, 60.0 - kalman.get_beta() * 50.0);
    }

    #[test]
    fn test_covariance_never_exceeds_prediction() {
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-4, 1e-2).unwrap();
        for i in 0..200 {
            let x = 50.0 + (i % 13) as f64;
            let y = 0.9 * x + (i % 5) as f64 * 0.1;
            kalman.update(i, x, y).unwrap();
            let state = kalman.state();
            assert!(state.covariance >= 0.0);
            assert!(state.covariance <= state.predicted_covariance);
        }
    }

    #[test]
    fn test_clamp_bounds_hedge_ratio() {
        let config = FilterConfig {
            max_abs_hedge_ratio: Some(2.0),
            process_noise: 1e-2,
            ..Default::default()
        };
        let mut kalman = KalmanHedgeRatio::from_config(&config).unwrap();
        for i in 0..200 {
            kalman.update(i, 10.0, 80.0).unwrap();
        }
        assert_eq!(kalman.get_beta(), 2.0);
    }

    #[test]
    fn test_kalman_warmup() {
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-5, 1e-3).unwrap();
        assert!(!kalman.is_warmed_up(100));

        for i in 0..100 {
            kalman.update(i, 100.0 + i as f64, 100.0 + i as f64).unwrap();
        }
        assert!(kalman.is_warmed_up(100));
    }

    #[test]
    fn test_kalman_reset_restores_prior() {
        let mut kalman = KalmanHedgeRatio::new(1.0, 1e-5, 1e-3)
            .unwrap()
            .with_prior(2.0)
            .unwrap();

        for i in 0..100 {
            kalman.update(i, 100.0, 80.0).unwrap();
        }

        kalman.reset();
        assert_eq!(kalman.get_beta(), 2.0);
        assert_eq!(kalman.get_variance(), 1.0);
        assert_eq!(kalman.get_update_count(), 0);
        assert_eq!(kalman.state().last_innovation, None);
    }
}
