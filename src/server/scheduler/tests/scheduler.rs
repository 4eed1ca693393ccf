//! Tests for UpdateScheduler.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::server::{
    error::Error,
    model::worker::WorkItem,
    scheduler::{SchedulerConfig, SweepTiming, UpdateScheduler},
    service::topology::TopologyRefresher,
    store::{MemoryStore, UserStore},
    worker::queue::{WorkerQueue, WorkerQueueConfig},
};

const FLOOR: Duration = Duration::from_secs(15 * 60);

#[derive(Default)]
struct CountingRefresher {
    calls: AtomicUsize,
    completed: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl TopologyRefresher for CountingRefresher {
    async fn refresh(&self) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Wednesday, far away from any realm reset.
fn midweek() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
}

/// Ten seconds before the EU realm reset.
fn before_reset() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 12, 18, 14, 50).unwrap()
}

async fn store_with_users(users: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for user in users {
        store.add_key(user, &format!("KEY-{}", user)).await.unwrap();
    }
    store
}

fn scheduler(
    store: Arc<MemoryStore>,
    refresher: Arc<CountingRefresher>,
    queue: WorkerQueue,
    clock: fn() -> DateTime<Utc>,
) -> UpdateScheduler {
    let config = SchedulerConfig {
        user_interval: Duration::from_millis(200),
        min_sweep_interval: FLOOR,
    };
    let timing = SweepTiming::new(config.min_sweep_interval, config.user_interval);

    UpdateScheduler::new(store, refresher, queue, timing, config).with_clock(clock)
}

async fn drain(queue: &WorkerQueue) -> Vec<WorkItem> {
    let mut items = Vec::new();
    while !queue.is_empty() {
        if let Some(item) = queue.pop().await {
            items.push(item);
        }
    }
    items
}

/// Tests that a sweep emits one non-forced item per user.
#[tokio::test(start_paused = true)]
async fn sweep_emits_one_item_per_user() {
    let store = store_with_users(&["alice", "bob", "carol"]).await;
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));
    let scheduler = scheduler(store, Arc::default(), queue.clone(), midweek);

    let count = scheduler.sweep().await.unwrap();
    let items = drain(&queue).await;

    assert_eq!(count, 3);
    assert_eq!(
        items,
        vec![
            WorkItem::sweep("alice"),
            WorkItem::sweep("bob"),
            WorkItem::sweep("carol"),
        ]
    );
}

/// Tests that emission is paced by the user interval.
#[tokio::test(start_paused = true)]
async fn sweep_is_paced() {
    let store = store_with_users(&["alice", "bob", "carol"]).await;
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));
    let scheduler = scheduler(store, Arc::default(), queue, midweek);

    let started = tokio::time::Instant::now();
    scheduler.sweep().await.unwrap();

    // First item immediately, then one every 200ms
    assert!(started.elapsed() >= Duration::from_millis(400));
}

/// Tests that start runs the initial refresh and sweep before returning.
#[tokio::test(start_paused = true)]
async fn start_runs_initial_refresh_and_sweep() {
    let store = store_with_users(&["alice", "bob"]).await;
    let refresher = Arc::new(CountingRefresher::default());
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));

    let handle = scheduler(store, refresher.clone(), queue.clone(), midweek)
        .start()
        .await;

    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(queue.len(), 2);

    handle.stop().await;
}

/// Tests that the next sweep happens once the sweep interval elapsed.
#[tokio::test(start_paused = true)]
async fn sweeps_again_after_interval() {
    let store = store_with_users(&["alice", "bob"]).await;
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));
    let handle = scheduler(store, Arc::default(), queue.clone(), midweek)
        .start()
        .await;
    drain(&queue).await;

    tokio::time::sleep(FLOOR - Duration::from_secs(1)).await;
    assert!(queue.is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(drain(&queue).await.len(), 2);

    handle.stop().await;
}

/// Tests that a manual request triggers a sweep without waiting for the interval.
#[tokio::test(start_paused = true)]
async fn manual_request_triggers_sweep() {
    let store = store_with_users(&["alice"]).await;
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));
    let handle = scheduler(store, Arc::default(), queue.clone(), midweek)
        .start()
        .await;
    drain(&queue).await;

    handle.request_sweep();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(drain(&queue).await, vec![WorkItem::sweep("alice")]);

    handle.stop().await;
}

/// Tests that the realm reset refreshes the topology before sweeping.
#[tokio::test(start_paused = true)]
async fn realm_reset_refreshes_topology() {
    let store = store_with_users(&["alice"]).await;
    let refresher = Arc::new(CountingRefresher::default());
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));
    let handle = scheduler(store, refresher.clone(), queue.clone(), before_reset)
        .start()
        .await;
    drain(&queue).await;

    tokio::time::sleep(Duration::from_secs(11)).await;

    assert!(refresher.calls.load(Ordering::SeqCst) >= 2);
    assert!(!drain(&queue).await.is_empty());

    handle.stop().await;
}

/// Tests that stopping during a realm reset lets the topology refresh finish.
#[tokio::test(start_paused = true)]
async fn stop_waits_for_topology_refresh() {
    let store = store_with_users(&["alice"]).await;
    let refresher = Arc::new(CountingRefresher {
        delay: Duration::from_secs(5),
        ..CountingRefresher::default()
    });
    let queue = WorkerQueue::new(WorkerQueueConfig::new(10));
    let handle = scheduler(store, refresher.clone(), queue.clone(), before_reset)
        .start()
        .await;
    drain(&queue).await;

    // The reset fires after 10s, its refresh is still running at 11s
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(refresher.completed.load(Ordering::SeqCst), 1);

    handle.stop().await;

    assert_eq!(refresher.completed.load(Ordering::SeqCst), 2);
    assert!(!handle.is_running().await);
}

/// Tests that stop ends the loop.
#[tokio::test(start_paused = true)]
async fn stop_ends_loop() {
    let store = store_with_users(&[]).await;
    let handle = scheduler(
        store,
        Arc::default(),
        WorkerQueue::new(WorkerQueueConfig::new(1)),
        midweek,
    )
    .start()
    .await;
    assert!(handle.is_running().await);

    handle.stop().await;

    assert!(!handle.is_running().await);
}
