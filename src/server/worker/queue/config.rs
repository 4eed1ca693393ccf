/// Queue depth per worker.
pub const DEFAULT_QUEUE_DEPTH_FACTOR: usize = 2;

/// Configuration for the work queue
#[derive(Debug, Clone)]
pub struct WorkerQueueConfig {
    pub workers: usize,
    /// Capacity is `workers * depth_factor`; producers block once it is reached.
    pub depth_factor: usize,
}

impl WorkerQueueConfig {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            depth_factor: DEFAULT_QUEUE_DEPTH_FACTOR,
        }
    }

    pub fn with_depth_factor(mut self, depth_factor: usize) -> Self {
        self.depth_factor = depth_factor;
        self
    }

    pub fn capacity(&self) -> usize {
        self.workers.saturating_mul(self.depth_factor).max(1)
    }
}

impl Default for WorkerQueueConfig {
    fn default() -> Self {
        Self::new(4)
    }
}
