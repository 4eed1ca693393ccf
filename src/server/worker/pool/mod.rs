//! Worker pool processing work items with bounded concurrency.
//!
//! Dispatcher tasks take a semaphore permit first and only then pop the next item, so an
//! item is never taken off the queue without a worker ready to run it. Work items are never
//! cancelled once started; shutdown waits for them to finish.

mod config;

pub use config::WorkerPoolConfig;

use std::sync::Arc;

use tokio::{
    sync::{watch, OwnedSemaphorePermit, RwLock, Semaphore},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, error, info, warn};

use crate::server::{
    error::Error,
    model::worker::WorkItem,
    worker::{handler::JobHandler, queue::WorkerQueue},
};

/// Worker pool for processing items from the WorkerQueue.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<WorkerPoolRef>,
}

struct WorkerPoolRef {
    config: WorkerPoolConfig,
    queue: WorkerQueue,
    handler: Arc<dyn JobHandler>,
    semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    dispatcher_handles: RwLock<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates a new worker pool.
    ///
    /// The pool is created in a stopped state and must be started with `start()`.
    ///
    /// # Arguments
    /// - `config` - Configuration including max concurrent jobs and dispatcher settings
    /// - `queue` - Queue to take work items from
    /// - `handler` - Handler executing a single work item
    pub fn new(
        config: WorkerPoolConfig,
        queue: WorkerQueue,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(WorkerPoolRef {
                config,
                queue,
                handler,
                semaphore,
                shutdown,
                dispatcher_handles: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Starts the worker pool.
    ///
    /// Spawns the configured number of dispatcher tasks and returns immediately. Calling it
    /// while already running logs a warning and returns Ok.
    pub async fn start(&self) -> Result<(), Error> {
        let mut handles = self.inner.dispatcher_handles.write().await;

        if !handles.is_empty() {
            warn!("Worker pool is already running");
            return Ok(());
        }

        self.inner.shutdown.send_replace(false);

        info!(
            "Starting worker pool with {} dispatcher(s) (max {} concurrent work items)",
            self.inner.config.dispatcher_count, self.inner.config.max_concurrent_jobs
        );

        for id in 0..self.inner.config.dispatcher_count {
            handles.push(self.spawn_dispatcher(id));
        }

        Ok(())
    }

    fn spawn_dispatcher(&self, id: usize) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let mut shutdown = self.inner.shutdown.subscribe();

        tokio::spawn(async move {
            debug!("Dispatcher {} started", id);

            loop {
                if *shutdown.borrow_and_update() {
                    break;
                }

                tokio::select! {
                    // Biased select ensures shutdown signal is prioritized
                    // over processing new items, enabling faster shutdown.
                    biased;

                    _ = shutdown.changed() => {
                        debug!("Dispatcher {} received shutdown signal", id);
                        break;
                    }

                    dispatched = Self::dispatch_next(&inner) => {
                        if !dispatched {
                            break;
                        }
                    }
                }
            }

            debug!("Dispatcher {} stopped", id);
        })
    }

    /// Waits for a free worker, then for an item, and spawns its execution.
    ///
    /// # Returns
    /// `false` when the pool cannot dispatch anymore
    async fn dispatch_next(inner: &Arc<WorkerPoolRef>) -> bool {
        let permit = match inner.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            // Semaphore closed, shutting down
            Err(_) => return false,
        };

        // Nothing awaits between the pop and the spawn, so an item is never lost
        // when this future is dropped by the shutdown branch.
        let Some(item) = inner.queue.pop().await else {
            return false;
        };

        let handler = Arc::clone(&inner.handler);
        let slow_job_warning = inner.config.slow_job_warning();
        tokio::spawn(async move {
            Self::execute_job(item, handler, slow_job_warning, permit).await;
        });

        true
    }

    /// Executes one work item; the permit is held until it completes.
    async fn execute_job(
        item: WorkItem,
        handler: Arc<dyn JobHandler>,
        slow_job_warning: std::time::Duration,
        _permit: OwnedSemaphorePermit,
    ) {
        let started = Instant::now();

        match handler.handle(&item).await {
            Ok(()) => debug!("Work item completed: {}", item),
            Err(e) => error!("Work item failed: {}, error: {}", item, e),
        }

        let elapsed = started.elapsed();
        if elapsed > slow_job_warning {
            warn!("Work item took {:?}: {}", elapsed, item);
        }
    }

    /// Stops the worker pool gracefully.
    ///
    /// Signals all dispatchers to stop, then waits for in-flight work items to finish (up to
    /// the drain timeout). Items still queued are dropped; the next sweep recreates them.
    pub async fn stop(&self) -> Result<(), Error> {
        if !self.is_running().await {
            debug!("Worker pool is already stopped");
            return Ok(());
        }

        info!("Shutting down worker pool...");

        self.inner.shutdown.send_replace(true);

        let mut handles = self.inner.dispatcher_handles.write().await;
        let dispatcher_count = handles.len();

        for (i, handle) in handles.drain(..).enumerate() {
            match tokio::time::timeout(self.inner.config.shutdown_timeout(), handle).await {
                Ok(Ok(())) => debug!("Dispatcher {} stopped cleanly", i),
                Ok(Err(e)) => error!("Dispatcher {} panicked: {:?}", i, e),
                Err(_) => warn!("Dispatcher {} did not stop within timeout", i),
            }
        }

        // Every permit back means every in-flight item finished
        let max = self.inner.config.max_concurrent_jobs as u32;
        match tokio::time::timeout(
            self.inner.config.drain_timeout(),
            self.inner.semaphore.acquire_many(max),
        )
        .await
        {
            Ok(Ok(permits)) => drop(permits),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                "{} work item(s) still running after {:?}",
                self.active_job_count(),
                self.inner.config.drain_timeout()
            ),
        }

        info!(
            "Worker pool shut down ({} dispatchers stopped, {} item(s) left in queue)",
            dispatcher_count,
            self.inner.queue.len()
        );

        Ok(())
    }

    /// Checks if the worker pool is running.
    pub async fn is_running(&self) -> bool {
        !self.inner.dispatcher_handles.read().await.is_empty()
    }

    /// Gets the number of active dispatchers.
    pub async fn dispatcher_count(&self) -> usize {
        self.inner.dispatcher_handles.read().await.len()
    }

    /// Gets the number of busy workers.
    ///
    /// While running, every dispatcher reserves one worker as it waits for the next item,
    /// so an idle pool reports its dispatcher count.
    pub fn active_job_count(&self) -> usize {
        self.inner.config.max_concurrent_jobs - self.inner.semaphore.available_permits()
    }
}
