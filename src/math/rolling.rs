//! Fixed-capacity rolling window with mean and standard deviation.

use std::collections::VecDeque;

/// Rolling buffer of the most recent `capacity` values.
///
/// Statistics are recomputed from the buffer on demand (two-pass).
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Sample standard deviation (n-1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance = self
            .values
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1) as f64;
        Some(variance.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_eq!(window.len(), 3);
        assert_relative_eq!(window.mean().unwrap(), 3.0);
        assert_relative_eq!(window.std_dev().unwrap(), 1.0);
    }

    #[test]
    fn test_constant_values_have_zero_std() {
        let mut window = RollingWindow::new(5);
        for _ in 0..5 {
            window.push(50.0);
        }
        assert_eq!(window.std_dev(), Some(0.0));
    }

    #[test]
    fn test_single_value_has_no_std() {
        let mut window = RollingWindow::new(5);
        window.push(1.0);
        assert_eq!(window.std_dev(), None);
    }
}
