// Capacity Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENT_USERS: u32 = 2;
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 30;
pub const DEFAULT_ESTIMATED_SERVICE_TIME_SECONDS: u64 = 180;
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;

/// Process-wide admission capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub max_concurrent_users: u32,
    /// TTL of both waiting entries and active memberships
    pub timeout_minutes: u32,
    pub estimated_service_time_seconds: u64,
    pub tick_interval_secs: u64,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            max_concurrent_users: DEFAULT_MAX_CONCURRENT_USERS,
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            estimated_service_time_seconds: DEFAULT_ESTIMATED_SERVICE_TIME_SECONDS,
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
        }
    }
}

impl Capacity {
    /// Create a validated capacity
    pub fn new(
        max_concurrent_users: u32,
        timeout_minutes: u32,
        estimated_service_time_seconds: u64,
        tick_interval_secs: u64,
    ) -> Result<Self> {
        let capacity = Self {
            max_concurrent_users,
            timeout_minutes,
            estimated_service_time_seconds,
            tick_interval_secs,
        };
        capacity.validate()?;
        Ok(capacity)
    }

    /// Check invariants (also used after deserializing from config)
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_users < 1 {
            return Err(DomainError::InvalidCapacity(
                "max_concurrent_users must be >= 1".to_string(),
            ));
        }
        if self.timeout_minutes < 1 {
            return Err(DomainError::InvalidCapacity(
                "timeout_minutes must be >= 1".to_string(),
            ));
        }
        if self.tick_interval_secs == 0 {
            return Err(DomainError::InvalidCapacity(
                "tick_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ttl_millis(&self) -> i64 {
        self.timeout_minutes as i64 * 60 * 1000
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let capacity = Capacity::default();
        assert_eq!(capacity.max_concurrent_users, 2);
        assert_eq!(capacity.timeout_minutes, 30);
        assert_eq!(capacity.estimated_service_time_seconds, 180);
        assert_eq!(capacity.tick_interval(), Duration::from_secs(5));
        assert_eq!(capacity.ttl_millis(), 30 * 60 * 1000);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Capacity::new(0, 30, 180, 5);
        assert!(matches!(result, Err(DomainError::InvalidCapacity(_))));
    }

    #[test]
    fn test_zero_tick_rejected() {
        assert!(Capacity::new(2, 30, 180, 0).is_err());
        assert!(Capacity::new(2, 0, 180, 5).is_err());
    }
}
