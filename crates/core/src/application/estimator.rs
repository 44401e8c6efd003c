// Wait Time Estimation

use crate::domain::{Capacity, WaitEstimate};

/// Projects admission delay from a 1-based waiting position
///
/// Users are admitted in batches of `max_concurrent_users`, each batch taking
/// `estimated_service_time_seconds`.
#[derive(Debug, Clone)]
pub struct WaitEstimator {
    max_concurrent_users: u64,
    service_time_secs: u64,
}

impl WaitEstimator {
    pub fn new(capacity: &Capacity) -> Self {
        Self {
            max_concurrent_users: u64::from(capacity.max_concurrent_users.max(1)),
            service_time_secs: capacity.estimated_service_time_seconds,
        }
    }

    pub fn estimate(&self, position: u64) -> WaitEstimate {
        if position == 0 {
            return WaitEstimate::zero();
        }

        let batch = position.div_ceil(self.max_concurrent_users);
        let seconds = batch.saturating_mul(self.service_time_secs);

        WaitEstimate {
            seconds,
            minutes: seconds.div_ceil(60),
            formatted: format_wait(seconds),
        }
    }
}

// Whole units only (floor), unlike `minutes`
fn format_wait(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{} seconds", seconds);
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} minutes", minutes);
    }
    format!("{} hours {} minutes", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator(max: u32, service_secs: u64) -> WaitEstimator {
        WaitEstimator::new(&Capacity::new(max, 30, service_secs, 5).unwrap())
    }

    #[test]
    fn test_position_three_default_capacity() {
        let est = estimator(2, 180).estimate(3);
        assert_eq!(est.seconds, 360);
        assert_eq!(est.minutes, 6);
        assert_eq!(est.formatted, "6 minutes");
    }

    #[test]
    fn test_zero_position() {
        assert_eq!(estimator(2, 180).estimate(0), WaitEstimate::zero());
    }

    #[test]
    fn test_batches_round_up() {
        let est = estimator(2, 180);
        assert_eq!(est.estimate(1).seconds, 180);
        assert_eq!(est.estimate(2).seconds, 180);
        assert_eq!(est.estimate(3).seconds, 360);
    }

    #[test]
    fn test_seconds_format() {
        let est = estimator(1, 45).estimate(1);
        assert_eq!(est.formatted, "45 seconds");
        assert_eq!(est.minutes, 1);
    }

    #[test]
    fn test_minutes_floor_vs_ceil() {
        // 90 seconds: formatted floors, minutes ceils
        let est = estimator(1, 90).estimate(1);
        assert_eq!(est.formatted, "1 minutes");
        assert_eq!(est.minutes, 2);
    }

    #[test]
    fn test_hours_format() {
        // 25 batches * 180s = 4500s = 75 minutes
        let est = estimator(1, 180).estimate(25);
        assert_eq!(est.seconds, 4500);
        assert_eq!(est.formatted, "1 hours 15 minutes");
    }

    #[test]
    fn test_huge_service_time_saturates() {
        let e = estimator(1, u64::MAX);
        let est = e.estimate(3);
        assert_eq!(est.seconds, u64::MAX);
        assert_eq!(est.minutes, u64::MAX.div_ceil(60));
    }
}
