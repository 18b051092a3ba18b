//! FIFO request slot limiter.
//!
//! Every fetch first acquires a slot. Slots are handed out in arrival order;
//! the first is released immediately and each following one only after the
//! configured (jittered) delay has passed since the previous release.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub use config::{LimiterStats, RateLimitConfig};

#[derive(Debug, Default)]
pub(crate) struct SlotState {
    next_release: Option<Instant>,
    stats: LimiterStats,
}

/// Shared slot limiter. Clones share the same queue.
#[derive(Debug)]
pub struct RateLimiter {
    pub(crate) config: RateLimitConfig,
    pub(crate) state: Arc<Mutex<SlotState>>,
}

impl RateLimiter {
    /// Create a new rate limiter with default config.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a new rate limiter with custom config.
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    /// Limiter without jitter and with the given spacing.
    pub fn fixed(delay: Duration) -> Self {
        Self::with_config(RateLimitConfig { delay, jitter: 0.0 })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait for the next slot.
    ///
    /// The queue lock is held while waiting. tokio's mutex is fair, so
    /// waiters are served in the order they called `acquire`.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        if let Some(next) = state.next_release {
            let now = Instant::now();
            if next > now {
                let wait = next - now;
                debug!("Rate limiting: waiting {:?} for next slot", wait);
                tokio::time::sleep(wait).await;
                state.stats.total_wait += wait;
            }
        }

        state.stats.slots_released += 1;
        state.next_release = Some(Instant::now() + self.config.jittered_delay());
    }

    pub async fn stats(&self) -> LimiterStats {
        self.state.lock().await.stats.clone()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }
}
