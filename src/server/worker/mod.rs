//! Bounded work item queue and the pool draining it.

pub mod handler;
pub mod pool;
pub mod queue;

use std::sync::Arc;

pub use pool::WorkerPool;
pub use queue::WorkerQueue;

use crate::server::worker::{handler::JobHandler, pool::WorkerPoolConfig, queue::WorkerQueueConfig};

#[derive(Clone)]
pub struct Worker {
    pub queue: WorkerQueue,
    pub pool: WorkerPool,
}

impl Worker {
    /// Creates a queue sized for `workers` and a pool of `workers` concurrent jobs on it.
    pub fn new(workers: usize, depth_factor: usize, handler: Arc<dyn JobHandler>) -> Self {
        let queue_config = WorkerQueueConfig::new(workers).with_depth_factor(depth_factor);
        let queue = WorkerQueue::new(queue_config);
        let pool = WorkerPool::new(WorkerPoolConfig::new(workers), queue.clone(), handler);

        Self { queue, pool }
    }
}
