//! services/api/src/adapters/rate_limit.rs
//!
//! In-process sliding-window rate limiter implementing the `RateLimiter`
//! port. It is an auxiliary guard, not a correctness mechanism: it may be
//! approximate across processes, but it fails closed whenever its own
//! state is unreadable.

use mining_core::RateLimiter;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type ClockFn = dyn Fn() -> i64 + Send + Sync;

/// Sliding-window limiter keyed by an arbitrary identifier string.
pub struct SlidingWindowLimiter {
    // Timestamps (ms) of recent attempts per key, oldest first.
    windows: Mutex<HashMap<String, Vec<i64>>>,
    clock: Box<ClockFn>,
}

impl SlidingWindowLimiter {
    /// Limiter backed by the real clock.
    pub fn new() -> Self {
        Self::with_clock(Box::new(|| chrono::Utc::now().timestamp_millis()))
    }

    /// Limiter with an injected clock; used by tests to drive time.
    pub fn with_clock(clock: Box<ClockFn>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str, limit: u32, window: Duration) -> Result<(), i64> {
        let now = (self.clock)();
        let window_ms = window.as_millis() as i64;

        // Poisoned lock means ambiguous state: reject rather than
        // double-allow.
        let Ok(mut windows) = self.windows.lock() else {
            return Err(window.as_secs() as i64);
        };

        let attempts = windows.entry(key.to_string()).or_default();
        attempts.retain(|&t| now - t < window_ms);

        if attempts.len() >= limit as usize {
            let oldest = attempts.first().copied().unwrap_or(now);
            let retry_after_ms = (oldest + window_ms - now).max(0);
            return Err((retry_after_ms + 999) / 1000);
        }

        attempts.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn limiter_with_fake_clock() -> (SlidingWindowLimiter, Arc<AtomicI64>) {
        let time = Arc::new(AtomicI64::new(0));
        let handle = time.clone();
        let limiter =
            SlidingWindowLimiter::with_clock(Box::new(move || handle.load(Ordering::SeqCst)));
        (limiter, time)
    }

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let (limiter, _) = limiter_with_fake_clock();
        let window = Duration::from_secs(60);

        for _ in 0..5 {
            assert!(limiter.check("user-1", 5, window).is_ok());
        }
        let retry = limiter.check("user-1", 5, window).unwrap_err();
        assert!(retry > 0 && retry <= 60);
    }

    #[test]
    fn window_slides_and_frees_capacity() {
        let (limiter, time) = limiter_with_fake_clock();
        let window = Duration::from_secs(60);

        for _ in 0..5 {
            assert!(limiter.check("user-1", 5, window).is_ok());
        }
        assert!(limiter.check("user-1", 5, window).is_err());

        // Just past the window, the oldest attempt ages out.
        time.store(60_001, Ordering::SeqCst);
        assert!(limiter.check("user-1", 5, window).is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _) = limiter_with_fake_clock();
        let window = Duration::from_secs(60);

        for _ in 0..5 {
            assert!(limiter.check("user-1", 5, window).is_ok());
        }
        assert!(limiter.check("user-1", 5, window).is_err());
        assert!(limiter.check("user-2", 5, window).is_ok());
    }
}
