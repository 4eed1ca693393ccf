//! Bounded FIFO of work items shared by producers and the worker pool.
//!
//! Producers block in [`WorkerQueue::push`] once the queue is full, which paces full sweeps
//! to the speed of the workers. Items live in memory only.

mod config;

pub use config::{WorkerQueueConfig, DEFAULT_QUEUE_DEPTH_FACTOR};

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::trace;

use crate::server::{error::worker::WorkerError, model::worker::WorkItem};

#[derive(Clone)]
pub struct WorkerQueue {
    sender: mpsc::Sender<WorkItem>,
    receiver: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl WorkerQueue {
    pub fn new(config: WorkerQueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity());

        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Enqueues an item, waiting while the queue is full.
    pub async fn push(&self, item: WorkItem) -> Result<(), WorkerError> {
        trace!("Queueing {}", item);

        self.sender
            .send(item)
            .await
            .map_err(|_| WorkerError::QueueClosed)
    }

    /// Enqueues an item only if there is room right now.
    ///
    /// # Returns
    /// - `Ok(true)` - Item queued
    /// - `Ok(false)` - Queue is full, item dropped
    pub fn try_push(&self, item: WorkItem) -> Result<bool, WorkerError> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(WorkerError::QueueClosed),
        }
    }

    /// Takes the oldest item, waiting while the queue is empty.
    ///
    /// Consumers queue up on the receiver lock, so each item is handed to exactly one of
    /// them. Returns `None` only if every sender is gone, which cannot happen while this
    /// handle is alive.
    pub async fn pop(&self) -> Option<WorkItem> {
        self.receiver.lock().await.recv().await
    }

    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}
