//! Least-squares hedge ratio for seeding the Kalman prior.

use crate::error::{PairsError, Result};
use crate::types::PriceObservation;

/// OLS slope of `price_b` on `price_a` through the origin.
///
/// Matches the filter's measurement model `y = β x` (no intercept):
/// ```text
/// β = Σ(x·y) / Σ(x²)
/// ```
pub fn ols_hedge_ratio(observations: &[PriceObservation]) -> Result<f64> {
    if observations.len() < 2 {
        return Err(PairsError::InsufficientData {
            expected: 2,
            actual: observations.len(),
        });
    }

    let (sxy, sxx) = observations
        .iter()
        .fold((0.0, 0.0), |(sxy, sxx), obs| {
            (sxy + obs.price_a * obs.price_b, sxx + obs.price_a * obs.price_a)
        });

    let beta = sxy / sxx;
    if sxx > 0.0 && beta.is_finite() {
        Ok(beta)
    } else {
        Err(PairsError::invalid_parameter(
            "ols_window",
            format!("regression is degenerate (Σx² = {})", sxx),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_linear_relationship() {
        let obs: Vec<PriceObservation> = (0..50)
            .map(|i| {
                let a = 20.0 + i as f64;
                PriceObservation::new(i, a, 1.75 * a)
            })
            .collect();
        assert_relative_eq!(ols_hedge_ratio(&obs).unwrap(), 1.75, epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_points() {
        let obs = vec![PriceObservation::new(0, 10.0, 12.0)];
        assert!(matches!(
            ols_hedge_ratio(&obs),
            Err(PairsError::InsufficientData { expected: 2, actual: 1 })
        ));
    }
}
