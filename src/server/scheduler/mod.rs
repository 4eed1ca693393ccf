//! Scheduler driving full sweeps and topology refreshes.
//!
//! The scheduler runs the first topology refresh and the first full sweep before arming
//! its timers. Afterwards a single loop waits for whichever comes first: the next sweep, the
//! next weekly realm reset (topology refresh followed by a sweep) or a manual sweep request.
//! Sweeps emit one [`WorkItem`] per user into the bounded queue, paced by the user interval
//! and slowed down further by queue backpressure.

pub mod config;
pub mod schedule;
pub mod timing;

#[cfg(test)]
mod tests;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{watch, Mutex, Notify},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::server::{
    error::Error,
    model::worker::WorkItem,
    service::{account::cache::AccountCache, topology::TopologyRefresher},
    store::UserStore,
    util::time::next_realm_reset,
    worker::queue::WorkerQueue,
};

pub use config::SchedulerConfig;
pub use timing::SweepTiming;

/// Fallback wait when the next realm reset cannot be computed.
const RESET_RETRY: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    SweepDue,
    SweepRequested,
    RealmReset,
}

pub struct UpdateScheduler {
    users: Arc<dyn UserStore>,
    topology: Arc<dyn TopologyRefresher>,
    queue: WorkerQueue,
    timing: SweepTiming,
    config: SchedulerConfig,
    cache: Option<Arc<AccountCache>>,
    clock: fn() -> DateTime<Utc>,
}

impl UpdateScheduler {
    /// Creates a new instance of [`UpdateScheduler`].
    ///
    /// # Arguments
    /// - `users` - Source of the user ids to sweep
    /// - `topology` - Refreshed at start and on every realm reset
    /// - `queue` - Queue the work items are emitted into
    /// - `timing` - Shared sweep cadence, updated after every sweep
    pub fn new(
        users: Arc<dyn UserStore>,
        topology: Arc<dyn TopologyRefresher>,
        queue: WorkerQueue,
        timing: SweepTiming,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            users,
            topology,
            queue,
            timing,
            config,
            cache: None,
            clock: Utc::now,
        }
    }

    /// Purges entries older than the cache lifetime from `cache` after every sweep.
    pub fn with_cache(mut self, cache: Arc<AccountCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the wall clock used to find the next realm reset.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs the initial topology refresh and sweep, then arms the timers.
    ///
    /// Failures of the initial steps are logged; the timers retry them.
    pub async fn start(self) -> SchedulerHandle {
        self.refresh_topology().await;
        self.sweep_logged().await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let sweep_requested = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(shutdown_rx, Arc::clone(&sweep_requested)));

        SchedulerHandle {
            sweep_requested,
            shutdown: Arc::new(shutdown),
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>, sweep_requested: Arc<Notify>) {
        info!("Scheduler started");

        loop {
            let sweep_delay = self.timing.sweep_interval();
            let reset_delay = self.until_next_reset();
            debug!(
                "Next sweep in {:?}, next realm reset in {:?}",
                sweep_delay, reset_delay
            );

            let event = tokio::select! {
                biased;

                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(reset_delay) => Event::RealmReset,
                _ = tokio::time::sleep(sweep_delay) => Event::SweepDue,
                _ = sweep_requested.notified() => Event::SweepRequested,
            };

            // A started topology fetch always completes, shutdown is checked afterwards
            if event == Event::RealmReset {
                self.refresh_topology().await;
                if *shutdown.borrow() {
                    break;
                }
            }

            // Emission stops between items, nothing is taken off the queue by that
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,
                _ = self.sweep_logged() => {}
            }
        }

        info!("Scheduler stopped");
    }

    fn until_next_reset(&self) -> Duration {
        let now = (self.clock)();

        match next_realm_reset(now) {
            Ok(reset) => (reset - now).to_std().unwrap_or(Duration::ZERO),
            Err(e) => {
                error!("Failed to compute next realm reset: {}", e);
                RESET_RETRY
            }
        }
    }

    async fn refresh_topology(&self) {
        if let Err(e) = self.topology.refresh().await {
            error!("Realm topology refresh failed: {}", e);
        }
    }

    async fn sweep_logged(&self) {
        if let Err(e) = self.sweep().await {
            error!("Full sweep failed: {}", e);
        }
    }

    /// Emits one work item per known user.
    ///
    /// # Returns
    /// - `Ok(usize)` - Number of work items emitted
    /// - `Err(Error)` - The user store could not be read or the queue is closed
    pub async fn sweep(&self) -> Result<usize, Error> {
        let started = Instant::now();
        let users = self.users.list_all_user_ids().await?;

        info!("Starting full sweep of {} user(s)", users.len());

        let mut ticker = (!self.config.user_interval.is_zero()).then(|| {
            let mut ticker = tokio::time::interval(self.config.user_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        for user_id in &users {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }
            self.queue.push(WorkItem::sweep(user_id.as_str())).await?;
        }

        let elapsed = started.elapsed();
        self.timing.record_sweep(users.len(), elapsed);

        if let Some(cache) = &self.cache {
            let purged = cache.purge_older_than(self.timing.cache_ttl()).await;
            debug!("Purged {} stale account cache entries", purged);
        }

        info!(
            "Full sweep emitted {} work item(s) in {:?}, next sweep in {:?}",
            users.len(),
            elapsed,
            self.timing.sweep_interval()
        );

        Ok(users.len())
    }
}

/// Handle to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    sweep_requested: Arc<Notify>,
    shutdown: Arc<watch::Sender<bool>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SchedulerHandle {
    /// Requests a full sweep as soon as the current one (if any) is done.
    pub fn request_sweep(&self) {
        self.sweep_requested.notify_one();
    }

    /// Stops the scheduler loop, abandoning a sweep in progress.
    ///
    /// Work items already queued are left to the worker pool.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);

        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Scheduler task panicked: {:?}", e);
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
