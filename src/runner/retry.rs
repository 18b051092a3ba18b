//! Backoff schedule for local re-attempts and global retry passes.

use std::time::Duration;

use crate::config::Settings;

/// Ceiling for a single local re-attempt delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Retry limits and delays.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Local re-attempts per identifier and pass.
    pub max_reattempts: u32,
    pub base: Duration,
    pub multiplier: f64,
    /// Upper bound (exclusive) of the random extra delay.
    pub jitter: Duration,
    /// Global passes over the failed queue.
    pub passes: u32,
    pub pass_pause_base: Duration,
    pub pass_pause_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_reattempts: settings.max_reattempts,
            base: Duration::from_millis(settings.retry_base_ms),
            multiplier: settings.retry_multiplier,
            jitter: Duration::from_millis(settings.retry_jitter_ms),
            passes: settings.retry_passes,
            pass_pause_base: Duration::from_millis(settings.pass_pause_base_ms),
            pass_pause_max: Duration::from_millis(settings.pass_pause_max_ms),
        }
    }

    /// Deterministic part of the delay before re-attempt `n` (1-based),
    /// capped at [`MAX_BACKOFF`].
    pub fn base_backoff(&self, n: u32) -> Duration {
        let exponent = i32::try_from(n.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.multiplier.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Delay before re-attempt `n`: `base * multiplier^(n-1) + U[0, jitter)`.
    pub fn backoff(&self, n: u32) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(fastrand::u64(..jitter_ms))
        };
        self.base_backoff(n) + extra
    }

    /// Pause before global pass `pass` (1-based): doubles per pass, capped.
    pub fn pass_pause(&self, pass: u32) -> Duration {
        let factor = 2u32.saturating_pow(pass.saturating_sub(1));
        self.pass_pause_base
            .checked_mul(factor)
            .unwrap_or(self.pass_pause_max)
            .min(self.pass_pause_max)
    }
}
