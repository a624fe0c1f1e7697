//! Token-bucket rate limiter for provider calls.
//!
//! One bucket is shared across the process; every provider request acquires
//! a token first. Refill is continuous at the configured rate.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Process-wide token bucket.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a bucket refilling at `requests_per_second`, with burst
    /// capacity equal to one second of tokens.
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        let rate = f64::from(requests_per_second.max(1));
        Self {
            capacity: rate,
            refill_per_sec: rate,
            state: Mutex::new(BucketState { tokens: rate, last_refill: Instant::now() }),
        }
    }

    /// Acquires one token, sleeping until one is available.
    pub fn acquire(&self) {
        loop {
            let wait = {
                let Ok(mut state) = self.state.lock() else {
                    return;
                };
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                // Time until one token refills.
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            std::thread::sleep(wait.min(Duration::from_millis(50)));
        }
    }

    /// Attempts to acquire a token without blocking.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
