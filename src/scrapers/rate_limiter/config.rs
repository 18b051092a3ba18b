//! Rate limiter configuration.

use std::time::Duration;

/// Spacing between consecutive slot releases.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Fixed delay between releases.
    pub delay: Duration,
    /// Extra random delay as a fraction of `delay` (0.1 = up to +10%).
    pub jitter: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            jitter: 0.1,
        }
    }
}

impl RateLimitConfig {
    /// `delay` plus a uniformly drawn share of `delay * jitter`.
    pub fn jittered_delay(&self) -> Duration {
        if self.delay.is_zero() || self.jitter <= 0.0 {
            return self.delay;
        }
        let extra = self.delay.as_secs_f64() * self.jitter * fastrand::f64();
        self.delay + Duration::from_secs_f64(extra)
    }
}

/// Snapshot of limiter activity.
#[derive(Debug, Clone, Default)]
pub struct LimiterStats {
    pub slots_released: u64,
    pub total_wait: Duration,
}
