//! Irregular request pacing.

use std::time::Duration;

use crate::config::VntmSettings;

/// Random delay between requests plus an occasional long pause.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay_ms: (u64, u64),
    long_pause_ms: (u64, u64),
    long_pause_every: (u32, u32),
    requests: u32,
    next_long_pause_at: u32,
}

/// Uniform draw from the inclusive range, tolerating swapped bounds.
fn draw_u64(lo: u64, hi: u64) -> u64 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    fastrand::u64(lo..=hi)
}

fn draw_u32(lo: u32, hi: u32) -> u32 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    fastrand::u32(lo.max(1)..=hi.max(1))
}

impl Pacer {
    pub fn new(settings: &VntmSettings) -> Self {
        let long_pause_every = (settings.long_pause_every_min, settings.long_pause_every_max);
        Self {
            delay_ms: (settings.min_delay_ms, settings.max_delay_ms),
            long_pause_ms: (settings.long_pause_min_ms, settings.long_pause_max_ms),
            long_pause_every,
            requests: 0,
            next_long_pause_at: draw_u32(long_pause_every.0, long_pause_every.1),
        }
    }

    /// Count a finished request and return how long to wait before the next.
    ///
    /// Every N-th request (N re-drawn after each long pause) the long pause
    /// is added on top of the regular delay.
    pub fn after_request(&mut self) -> Duration {
        self.requests += 1;
        let mut wait = draw_u64(self.delay_ms.0, self.delay_ms.1);

        if self.requests >= self.next_long_pause_at {
            wait += draw_u64(self.long_pause_ms.0, self.long_pause_ms.1);
            self.next_long_pause_at += draw_u32(self.long_pause_every.0, self.long_pause_every.1);
        }

        Duration::from_millis(wait)
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_within_bounds() {
        let settings = VntmSettings::default();
        let mut pacer = Pacer::new(&settings);
        let mut long_pauses = 0;
        for _ in 0..60 {
            let wait = pacer.after_request();
            assert!(wait >= Duration::from_millis(800));
            if wait > Duration::from_millis(2500) {
                assert!(wait >= Duration::from_millis(5800));
                assert!(wait <= Duration::from_millis(17500));
                long_pauses += 1;
            }
        }
        // one long pause every 5 to 12 requests
        assert!((5..=12).contains(&long_pauses));
        assert_eq!(pacer.requests(), 60);
    }

    #[test]
    fn test_zero_delays() {
        let settings = VntmSettings {
            min_delay_ms: 0,
            max_delay_ms: 0,
            long_pause_min_ms: 0,
            long_pause_max_ms: 0,
            ..Default::default()
        };
        let mut pacer = Pacer::new(&settings);
        for _ in 0..20 {
            assert_eq!(pacer.after_request(), Duration::ZERO);
        }
    }
}
