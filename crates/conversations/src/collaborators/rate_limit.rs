//! Fixed-window rate limiting for message sends.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Throttle port. `allow` returns whether the keyed operation may
/// proceed right now, counting this attempt if so.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str, window: Duration, max_attempts: u32) -> bool;
}

struct WindowSlot {
    started: Instant,
    window: Duration,
    attempts: u32,
}

/// In-process fixed-window limiter. Expired windows are pruned on
/// access so idle keys do not accumulate.
#[derive(Default)]
pub struct FixedWindowLimiter {
    slots: Mutex<HashMap<String, WindowSlot>>,
}

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str, window: Duration, max_attempts: u32) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        slots.retain(|_, slot| slot.started.elapsed() < slot.window);

        let slot = slots.entry(key.to_string()).or_insert(WindowSlot {
            started: Instant::now(),
            window,
            attempts: 0,
        });

        if slot.attempts >= max_attempts {
            return false;
        }

        slot.attempts += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_max_attempts() {
        let limiter = FixedWindowLimiter::new();
        let window = Duration::from_secs(60);

        assert!(limiter.allow("send:user:1", window, 2));
        assert!(limiter.allow("send:user:1", window, 2));
        assert!(!limiter.allow("send:user:1", window, 2));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new();
        let window = Duration::from_secs(60);

        assert!(limiter.allow("send:user:1", window, 1));
        assert!(!limiter.allow("send:user:1", window, 1));
        assert!(limiter.allow("send:user:2", window, 1));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = FixedWindowLimiter::new();
        let window = Duration::from_millis(10);

        assert!(limiter.allow("send:user:1", window, 1));
        assert!(!limiter.allow("send:user:1", window, 1));

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.allow("send:user:1", window, 1));
    }
}
