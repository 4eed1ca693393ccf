//! Tests for WorkerPool.

use std::{sync::atomic::Ordering, time::Duration};

use wvwlink::server::{
    model::worker::WorkItem,
    worker::{
        pool::{WorkerPool, WorkerPoolConfig},
        queue::{WorkerQueue, WorkerQueueConfig},
        Worker,
    },
};

use super::{handler, wait_until, RecordingHandler};

const WAIT: Duration = Duration::from_secs(5);

/// Tests that every queued item is handled.
///
/// Expected: 5 items handled
#[tokio::test]
async fn processes_queued_items() {
    let recorder = handler(RecordingHandler::default());
    let worker = Worker::new(2, 2, recorder.clone());

    for user in ["a", "b", "c", "d"] {
        worker.queue.push(WorkItem::sweep(user)).await.unwrap();
    }
    worker.pool.start().await.unwrap();
    worker.queue.push(WorkItem::forced("e")).await.unwrap();

    assert!(wait_until(WAIT, || async { recorder.handled_count().await == 5 }).await);
    assert!(worker.queue.is_empty());

    worker.pool.stop().await.unwrap();
}

/// Tests that no more items run at once than the pool allows.
///
/// Expected: peak concurrency 2 with 8 slow items
#[tokio::test]
async fn respects_max_concurrent_jobs() {
    let recorder = handler(RecordingHandler::with_delay(Duration::from_millis(30)));
    let queue = WorkerQueue::new(WorkerQueueConfig::new(8));
    let pool = WorkerPool::new(WorkerPoolConfig::new(2), queue.clone(), recorder.clone());

    for i in 0..8 {
        queue.push(WorkItem::sweep(format!("user-{}", i))).await.unwrap();
    }
    pool.start().await.unwrap();

    assert!(wait_until(WAIT, || async { recorder.handled_count().await == 8 }).await);
    assert_eq!(recorder.peak.load(Ordering::SeqCst), 2);

    pool.stop().await.unwrap();
}

/// Tests that a failing item does not stop the pool.
#[tokio::test]
async fn keeps_running_after_failed_item() {
    let recorder = handler(RecordingHandler {
        failing_user: Some("bad".to_string()),
        ..Default::default()
    });
    let worker = Worker::new(1, 2, recorder.clone());
    worker.pool.start().await.unwrap();

    worker.queue.push(WorkItem::sweep("bad")).await.unwrap();
    worker.queue.push(WorkItem::sweep("good")).await.unwrap();

    assert!(wait_until(WAIT, || async { recorder.handled_count().await == 2 }).await);
    assert!(worker.pool.is_running().await);

    worker.pool.stop().await.unwrap();
}

/// Tests that stop waits for items already executing.
#[tokio::test]
async fn stop_waits_for_in_flight_items() {
    let recorder = handler(RecordingHandler::with_delay(Duration::from_millis(200)));
    let worker = Worker::new(2, 2, recorder.clone());
    worker.pool.start().await.unwrap();

    worker.queue.push(WorkItem::sweep("alice")).await.unwrap();
    assert!(wait_until(WAIT, || async { recorder.running.load(Ordering::SeqCst) == 1 }).await);

    worker.pool.stop().await.unwrap();

    assert_eq!(recorder.handled_count().await, 1);
    assert_eq!(worker.pool.active_job_count(), 0);
    assert!(!worker.pool.is_running().await);
}

/// Tests that starting twice keeps a single set of dispatchers.
#[tokio::test]
async fn start_is_idempotent() {
    let worker = Worker::new(2, 2, handler(RecordingHandler::default()));

    worker.pool.start().await.unwrap();
    let dispatchers = worker.pool.dispatcher_count().await;
    worker.pool.start().await.unwrap();

    assert_eq!(worker.pool.dispatcher_count().await, dispatchers);

    worker.pool.stop().await.unwrap();
    worker.pool.stop().await.unwrap();
}
