//! Observation validation.
//!
//! Provides composable validators so bad prices are rejected before the
//! estimator sees them.

use crate::error::{PairsError, Result};
use crate::types::PriceObservation;

/// Trait for validating a price observation before processing.
/// Enables testable and composable validation logic.
pub trait ObservationValidator: Send + Sync {
    /// Validates `obs` given the previously accepted observation, if any.
    fn validate(&self, obs: &PriceObservation, previous: Option<&PriceObservation>) -> Result<()>;
}

/// Validates both prices are positive and not NaN/Inf.
#[derive(Debug, Clone)]
pub struct PriceValidator;

impl ObservationValidator for PriceValidator {
    fn validate(&self, obs: &PriceObservation, _previous: Option<&PriceObservation>) -> Result<()> {
        for (leg, price) in [("a", obs.price_a), ("b", obs.price_b)] {
            if !price.is_finite() {
                return Err(PairsError::invalid_observation(
                    obs.timestamp,
                    format!("price_{} is not finite: {}", leg, price),
                ));
            }
            if price <= 0.0 {
                return Err(PairsError::invalid_observation(
                    obs.timestamp,
                    format!("price_{} must be positive, got {}", leg, price),
                ));
            }
        }
        Ok(())
    }
}

/// Validates timestamps are strictly increasing.
#[derive(Debug, Clone)]
pub struct OrderingValidator;

impl ObservationValidator for OrderingValidator {
    fn validate(&self, obs: &PriceObservation, previous: Option<&PriceObservation>) -> Result<()> {
        match previous {
            Some(prev) if obs.timestamp <= prev.timestamp => Err(PairsError::invalid_observation(
                obs.timestamp,
                format!(
                    "timestamp is not after the previous observation ({})",
                    prev.timestamp
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// Composite validator that chains multiple validators.
/// Fails on first validation error.
pub struct CompositeValidator {
    validators: Vec<Box<dyn ObservationValidator>>,
}

impl CompositeValidator {
    pub fn new(validators: Vec<Box<dyn ObservationValidator>>) -> Self {
        Self { validators }
    }
}

impl Default for CompositeValidator {
    /// Price sanity followed by ordering.
    fn default() -> Self {
        Self::new(vec![Box::new(PriceValidator), Box::new(OrderingValidator)])
    }
}

impl std::fmt::Debug for CompositeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeValidator")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl ObservationValidator for CompositeValidator {
    fn validate(&self, obs: &PriceObservation, previous: Option<&PriceObservation>) -> Result<()> {
        for validator in &self.validators {
            validator.validate(obs, previous)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        let validator = CompositeValidator::default();
        for (a, b) in [(0.0, 10.0), (10.0, -1.0), (f64::NAN, 10.0), (10.0, f64::INFINITY)] {
            let obs = PriceObservation::new(1, a, b);
            assert!(matches!(
                validator.validate(&obs, None),
                Err(PairsError::InvalidObservation { timestamp: 1, .. })
            ));
        }
    }

    #[test]
    fn test_rejects_out_of_order_and_duplicate_timestamps() {
        let validator = CompositeValidator::default();
        let prev = PriceObservation::new(100, 10.0, 10.0);
        assert!(validator
            .validate(&PriceObservation::new(100, 10.0, 10.0), Some(&prev))
            .is_err());
        assert!(validator
            .validate(&PriceObservation::new(99, 10.0, 10.0), Some(&prev))
            .is_err());
        assert!(validator
            .validate(&PriceObservation::new(101, 10.0, 10.0), Some(&prev))
            .is_ok());
    }
}
