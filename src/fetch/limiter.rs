// src/fetch/limiter.rs
// =============================================================================
// Per-worker request rate ceiling.
//
// All tasks of one worker share one RateLimiter. A task calls `wait()`
// before each request; `wait()` returns once at least `1 / max_rps`
// seconds have passed since the previously granted request.
//
// Waiters are not queued. A task that is too early sleeps for the missing
// time plus a random jitter in [0, 2 * min_period) and then tries again,
// so tasks that were refused together do not all wake up together. Any
// waiter may win the next slot.
// =============================================================================

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct RateLimiter {
    /// None disables throttling
    min_period: Option<Duration>,
    /// When the last request was let through
    last_call: Mutex<Option<Instant>>,
}

// Longest interval between two requests; slower rates are raised to it
pub const MAX_PERIOD: Duration = Duration::from_secs(1000);

impl RateLimiter {
    // `max_rps <= 0`, infinite or not a number means unthrottled
    pub fn new(max_rps: f64) -> Self {
        let min_period = (max_rps.is_finite() && max_rps > 0.0).then(|| {
            Duration::try_from_secs_f64(1.0 / max_rps)
                .map_or(MAX_PERIOD, |period| period.min(MAX_PERIOD))
        });
        Self {
            min_period,
            last_call: Mutex::new(None),
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.min_period.is_some()
    }

    #[cfg(test)]
    pub fn min_period(&self) -> Option<Duration> {
        self.min_period
    }

    // Waits for permission to send one request
    pub async fn wait(&self) {
        let Some(min_period) = self.min_period else {
            return;
        };

        loop {
            let delay = match self.try_acquire(min_period) {
                None => return,
                Some(delay) => delay,
            };
            let jitter = min_period.mul_f64(2.0 * rand::random::<f64>());
            tokio::time::sleep(delay + jitter).await;
        }
    }

    // Grants the slot (None) or says how long until the next one is free
    fn try_acquire(&self, min_period: Duration) -> Option<Duration> {
        // The guarded value is a plain timestamp, a poisoned lock is still usable
        let mut last_call = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();
        match *last_call {
            Some(last) if now < last + min_period => Some(last + min_period - now),
            _ => {
                *last_call = Some(now);
                None
            }
        }
    }
}
