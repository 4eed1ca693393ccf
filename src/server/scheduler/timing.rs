use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::server::scheduler::schedule::calculate_sweep_interval;

/// Measured sweep cadence shared by the scheduler and the account cache readers.
///
/// Updated once per completed sweep. The cache lifetime and the sweep spacing are the same
/// value: an account fetched in one sweep is served from cache until the next.
#[derive(Debug, Clone)]
pub struct SweepTiming {
    floor: Duration,
    user_interval: Duration,
    estimate_ms: Arc<AtomicU64>,
}

impl SweepTiming {
    pub fn new(floor: Duration, user_interval: Duration) -> Self {
        Self {
            floor,
            user_interval,
            estimate_ms: Arc::new(AtomicU64::new(duration_ms(floor))),
        }
    }

    /// Spacing until the next full sweep.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.estimate_ms.load(Ordering::Relaxed)).max(self.floor)
    }

    /// How long a cached account response may be served.
    pub fn cache_ttl(&self) -> Duration {
        self.sweep_interval()
    }

    /// Widens the estimate to cover a sweep that just finished.
    pub fn record_sweep(&self, user_count: usize, elapsed: Duration) {
        let estimate = calculate_sweep_interval(user_count, self.user_interval, self.floor)
            .max(elapsed);
        self.estimate_ms
            .store(duration_ms(estimate), Ordering::Relaxed);
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
