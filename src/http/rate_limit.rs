//! Per-client token bucket guarding the API routes.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, RevalidatorError};

/// Tracked keys at which idle (fully refilled) buckets are first swept.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Token bucket parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitConfig {
    /// Burst size: requests a fresh client may issue back to back.
    pub capacity: f64,

    /// Tokens restored per second.
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 30.0,
            refill_per_sec: 0.5,
        }
    }
}

impl RateLimitConfig {
    /// Validates the bucket parameters.
    ///
    /// # Errors
    /// Returns `RevalidatorError::Config` if `capacity < 1` or
    /// `refill_per_sec <= 0`.
    pub fn validate(&self) -> Result<()> {
        if self.capacity.is_nan() || self.capacity < 1.0 {
            return Err(RevalidatorError::config(
                "rate limit capacity must be at least 1",
            ));
        }
        if self.refill_per_sec.is_nan() || self.refill_per_sec <= 0.0 {
            return Err(RevalidatorError::config(
                "rate limit refill_per_sec must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// In-memory rate limiter keyed by client identifier.
///
/// Idle buckets are swept in batches: after a sweep, the next one waits
/// until a quarter of `max_keys` new keys have arrived, so a flood of
/// distinct clients costs amortized O(1) per request.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    max_keys: usize,
    buckets: Mutex<Buckets>,
}

#[derive(Debug)]
struct Buckets {
    by_key: HashMap<String, Bucket>,
    /// Map size that triggers the next sweep.
    next_sweep: usize,
}

impl RateLimiter {
    pub(crate) fn new() -> Self {
        Self::with_max_keys(MAX_TRACKED_KEYS)
    }

    fn with_max_keys(max_keys: usize) -> Self {
        Self {
            max_keys,
            buckets: Mutex::new(Buckets {
                by_key: HashMap::new(),
                next_sweep: max_keys,
            }),
        }
    }

    /// Takes one token for `key`; returns false if the bucket is empty.
    pub(crate) async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let mut lock = self.buckets.lock().await;
        let buckets = &mut *lock;

        if buckets.by_key.len() >= buckets.next_sweep && !buckets.by_key.contains_key(key) {
            let before = buckets.by_key.len();
            buckets.by_key.retain(|_, bucket| {
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens + elapsed * cfg.refill_per_sec < cfg.capacity
            });
            let margin = (self.max_keys / 4).max(1);
            buckets.next_sweep = (buckets.by_key.len() + margin).max(self.max_keys);
            debug!(
                evicted = before - buckets.by_key.len(),
                tracked = buckets.by_key.len(),
                "Swept idle rate-limit buckets"
            );
        }

        let bucket = buckets
            .by_key
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                tokens: cfg.capacity,
                last_refill: now,
            });
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.buckets.lock().await.by_key.len()
    }
}
