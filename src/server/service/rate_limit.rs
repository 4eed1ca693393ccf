//! Sliding-window rate limiter for the account API.
//!
//! Tokens live in a [`Semaphore`]. A consumed token is never released by the caller, it is
//! handed back by the refill task once a full window has passed since it was consumed, so at
//! most `capacity` requests can start inside any window. The refill task returns at most
//! [`RateLimiterConfig::max_refill_per_tick`] tokens per tick which smooths the recovery
//! after an upstream 429 drained the bucket.

use std::{
    collections::VecDeque,
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Mutex, Semaphore},
    time::{Instant, MissedTickBehavior},
};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests allowed per window.
    pub capacity: usize,
    pub window: Duration,
    /// How often the refill task runs.
    pub refill_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::per_minute(600)
    }
}

impl RateLimiterConfig {
    pub fn per_minute(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            window: Duration::from_secs(60),
            refill_interval: Duration::from_secs(1),
        }
    }

    /// Upper bound of tokens returned by one refill tick.
    pub fn max_refill_per_tick(&self) -> usize {
        let ticks = (self.window.as_nanos() / self.refill_interval.as_nanos().max(1)).max(1);
        let per_tick = (self.capacity as u128).div_ceil(ticks);

        per_tick.max(1) as usize
    }
}

struct RateLimiterRef {
    config: RateLimiterConfig,
    tokens: Semaphore,
    /// Consumed tokens and when they may be returned, oldest first.
    pending: Mutex<VecDeque<(Instant, usize)>>,
}

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterRef>,
}

impl RateLimiter {
    /// Creates a full bucket and spawns its refill task.
    ///
    /// The refill task ends on its own once the last handle is dropped. Must be called from
    /// within a tokio runtime.
    pub fn new(config: RateLimiterConfig) -> Self {
        let inner = Arc::new(RateLimiterRef {
            tokens: Semaphore::new(config.capacity),
            pending: Mutex::new(VecDeque::new()),
            config,
        });

        tokio::spawn(Self::refill_loop(Arc::downgrade(&inner)));

        Self { inner }
    }

    /// Waits for a token and consumes it.
    pub async fn acquire(&self) {
        // The semaphore is never closed
        if let Ok(permit) = self.inner.tokens.acquire().await {
            permit.forget();
            self.consumed(1).await;
        }
    }

    /// Consumes a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        match self.inner.tokens.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.consumed(1).await;
                true
            }
            Err(_) => false,
        }
    }

    /// Consumes every available token, used when upstream answered 429.
    ///
    /// # Returns
    /// Number of tokens drained
    pub async fn drain(&self) -> usize {
        loop {
            let available = self.inner.tokens.available_permits();
            if available == 0 {
                return 0;
            }

            // Another task took tokens in between, retry with what is left
            let Ok(permits) = self.inner.tokens.try_acquire_many(available as u32) else {
                continue;
            };

            permits.forget();
            self.consumed(available).await;
            warn!(
                "Drained {} rate limiter tokens after upstream rate limit",
                available
            );

            return available;
        }
    }

    pub fn available(&self) -> usize {
        self.inner.tokens.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.inner.config.capacity
    }

    async fn consumed(&self, count: usize) {
        let mut pending = self.inner.pending.lock().await;
        // Taken under the lock so the queue stays ordered by due time
        let due = Instant::now() + self.inner.config.window;
        pending.push_back((due, count));
    }

    async fn refill_loop(inner: Weak<RateLimiterRef>) {
        let refill_interval = match inner.upgrade() {
            Some(inner) => inner.config.refill_interval,
            None => return,
        };
        let mut ticker = tokio::time::interval(refill_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(inner) = inner.upgrade() else {
                return;
            };

            let returned = Self::refill(&inner).await;
            if returned > 0 {
                trace!("Returned {} rate limiter tokens", returned);
            }
        }
    }

    async fn refill(inner: &RateLimiterRef) -> usize {
        let now = Instant::now();
        let mut budget = inner.config.max_refill_per_tick();
        let mut returned = 0;

        {
            let mut pending = inner.pending.lock().await;
            while budget > 0 {
                let Some(front) = pending.front_mut() else {
                    break;
                };
                if front.0 > now {
                    break;
                }

                let take = front.1.min(budget);
                front.1 -= take;
                budget -= take;
                returned += take;

                if front.1 == 0 {
                    pending.pop_front();
                }
            }
        }

        // Never exceed capacity, even if accounting drifted
        let room = inner
            .config
            .capacity
            .saturating_sub(inner.tokens.available_permits());
        let returned = returned.min(room);
        if returned > 0 {
            inner.tokens.add_permits(returned);
        }

        returned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: usize, window_ms: u64, refill_ms: u64) -> RateLimiterConfig {
        RateLimiterConfig {
            capacity,
            window: Duration::from_millis(window_ms),
            refill_interval: Duration::from_millis(refill_ms),
        }
    }

    #[test]
    fn max_refill_per_tick_rounds_up() {
        assert_eq!(RateLimiterConfig::per_minute(600).max_refill_per_tick(), 10);
        assert_eq!(config(5, 1000, 100).max_refill_per_tick(), 1);
        assert_eq!(config(7, 1000, 500).max_refill_per_tick(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_capacity_within_a_window() {
        let window = Duration::from_millis(1000);
        let limiter = RateLimiter::new(config(5, 1000, 100));
        let mut grants: Vec<Instant> = Vec::new();

        for _ in 0..17 {
            limiter.acquire().await;
            grants.push(Instant::now());
        }

        for start in &grants {
            let in_window = grants
                .iter()
                .filter(|t| **t >= *start && **t < *start + window)
                .count();
            assert!(in_window <= 5, "{} grants inside one window", in_window);
        }
        // The first window is served immediately, later ones only after tokens came back
        assert_eq!(grants[4], grants[0]);
        assert!(grants[5] >= grants[0] + window);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_never_exceed_capacity_within_a_window() {
        let window = Duration::from_millis(1000);
        let limiter = RateLimiter::new(config(5, 1000, 100));
        let grants = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = limiter.clone();
                let grants = Arc::clone(&grants);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    grants.lock().await.push(Instant::now());
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let grants = grants.lock().await;
        assert_eq!(grants.len(), 40);
        for start in grants.iter() {
            let in_window = grants
                .iter()
                .filter(|t| **t >= *start && **t < *start + window)
                .count();
            assert!(in_window <= 5, "{} grants inside one window", in_window);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drain_takes_every_token_left() {
        let limiter = RateLimiter::new(config(10, 1000, 100));
        let other = limiter.clone();
        let racer = tokio::spawn(async move {
            for _ in 0..3 {
                other.try_acquire().await;
            }
        });

        let drained = limiter.drain().await;
        racer.await.unwrap();

        assert!(drained > 0);
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_blocks_until_window_passed() {
        let limiter = RateLimiter::new(config(10, 1000, 100));
        assert!(limiter.try_acquire().await);

        let drained = limiter.drain().await;

        assert_eq!(drained, 9);
        assert_eq!(limiter.available(), 0);
        assert!(!limiter.try_acquire().await);

        let started = Instant::now();
        limiter.acquire().await;
        assert!(Instant::now() >= started + Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn refill_is_smoothed_after_drain() {
        let limiter = RateLimiter::new(config(10, 1000, 100));
        limiter.drain().await;

        tokio::time::sleep(Duration::from_millis(1050)).await;

        // One token per tick comes back, not the whole bucket at once
        assert!(limiter.available() <= 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(limiter.available(), 10);
    }
}
