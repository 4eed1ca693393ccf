//! Tests for WorkerQueue.

use std::time::Duration;

use wvwlink::server::{
    model::worker::WorkItem,
    worker::queue::{WorkerQueue, WorkerQueueConfig, DEFAULT_QUEUE_DEPTH_FACTOR},
};

/// Tests that capacity is the worker count times the depth factor.
#[test]
fn capacity_scales_with_workers() {
    let queue = WorkerQueue::new(WorkerQueueConfig::new(4));
    assert_eq!(queue.capacity(), 4 * DEFAULT_QUEUE_DEPTH_FACTOR);

    let queue = WorkerQueue::new(WorkerQueueConfig::new(4).with_depth_factor(3));
    assert_eq!(queue.capacity(), 12);
}

/// Tests that items come out in the order they were pushed.
#[tokio::test]
async fn pops_in_fifo_order() {
    let queue = WorkerQueue::new(WorkerQueueConfig::new(2));

    queue.push(WorkItem::sweep("alice")).await.unwrap();
    queue.push(WorkItem::forced("bob")).await.unwrap();
    queue.push(WorkItem::for_group("carol", "g1")).await.unwrap();

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.pop().await, Some(WorkItem::sweep("alice")));
    assert_eq!(queue.pop().await, Some(WorkItem::forced("bob")));
    assert_eq!(queue.pop().await, Some(WorkItem::for_group("carol", "g1")));
    assert!(queue.is_empty());
}

/// Tests that try_push refuses items once the queue is full.
#[tokio::test]
async fn try_push_refuses_when_full() {
    let queue = WorkerQueue::new(WorkerQueueConfig::new(1).with_depth_factor(1));

    assert!(queue.try_push(WorkItem::sweep("alice")).unwrap());
    assert!(!queue.try_push(WorkItem::sweep("bob")).unwrap());
    assert_eq!(queue.len(), 1);
}

/// Tests that push blocks while the queue is full and resumes after a pop.
#[tokio::test]
async fn push_waits_for_capacity() {
    let queue = WorkerQueue::new(WorkerQueueConfig::new(1).with_depth_factor(1));
    queue.push(WorkItem::sweep("alice")).await.unwrap();

    let blocked = tokio::time::timeout(
        Duration::from_millis(50),
        queue.push(WorkItem::sweep("bob")),
    )
    .await;
    assert!(blocked.is_err(), "push should wait while the queue is full");

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.push(WorkItem::sweep("bob")).await })
    };

    assert_eq!(queue.pop().await, Some(WorkItem::sweep("alice")));
    producer.await.unwrap().unwrap();
    assert_eq!(queue.pop().await, Some(WorkItem::sweep("bob")));
}
