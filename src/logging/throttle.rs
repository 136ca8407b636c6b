//! Rate-limited logging utilities.
//!
//! Provides `LogThrottle` to prevent log storms while still tracking suppressed
//! messages. A backtest replays thousands of steps in milliseconds, so the
//! throttle counts occurrences rather than wall-clock time.

/// A lightweight rate limiter for logging to prevent log storms.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    occurrences: u64,
    suppressed_count: u64,
    every: u64,
}

impl LogThrottle {
    /// Emit the first occurrence and then one in every `every` occurrences.
    pub fn new(every: u64) -> Self {
        Self {
            occurrences: 0,
            suppressed_count: 0,
            every: every.max(1),
        }
    }

    /// Checks if a log should be emitted.
    /// If false, increments the suppressed counter.
    pub fn should_log(&mut self) -> bool {
        let emit = self.occurrences % self.every == 0;
        self.occurrences += 1;
        if !emit {
            self.suppressed_count += 1;
        }
        emit
    }

    /// Returns the number of suppressed logs since the last successful log, and resets the counter.
    pub fn get_and_reset_suppressed_count(&mut self) -> u64 {
        let count = self.suppressed_count;
        self.suppressed_count = 0;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_then_every_nth() {
        let mut throttle = LogThrottle::new(3);
        let emitted: Vec<bool> = (0..7).map(|_| throttle.should_log()).collect();
        assert_eq!(emitted, vec![true, false, false, true, false, false, true]);
        assert_eq!(throttle.get_and_reset_suppressed_count(), 4);
        assert_eq!(throttle.get_and_reset_suppressed_count(), 0);
    }

    #[test]
    fn test_suppressed_count_covers_gap_since_last_log() {
        let mut throttle = LogThrottle::new(100);
        let mut reported = Vec::new();
        for _ in 0..250 {
            if throttle.should_log() {
                reported.push(throttle.get_and_reset_suppressed_count());
            }
        }
        assert_eq!(reported, vec![0, 99, 99]);
        assert_eq!(throttle.get_and_reset_suppressed_count(), 49);
    }

    #[test]
    fn test_zero_interval_logs_everything() {
        let mut throttle = LogThrottle::new(0);
        assert!((0..5).all(|_| throttle.should_log()));
    }
}
