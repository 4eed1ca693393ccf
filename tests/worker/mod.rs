mod pool;
mod queue;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use wvwlink::server::{
    error::Error,
    model::worker::WorkItem,
    worker::handler::JobHandler,
};

/// Handler recording every item and the peak number of concurrent executions.
#[derive(Default)]
pub struct RecordingHandler {
    pub handled: Mutex<Vec<WorkItem>>,
    pub delay: Duration,
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
    /// Items for this user fail.
    pub failing_user: Option<String>,
}

impl RecordingHandler {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub async fn handled_count(&self) -> usize {
        self.handled.lock().await.len()
    }
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, item: &WorkItem) -> Result<(), Error> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.handled.lock().await.push(item.clone());
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.failing_user.as_deref() == Some(item.user_id.as_str()) {
            return Err(Error::InternalError("handler failure".to_string()));
        }

        Ok(())
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition().await
}

pub fn handler(handler: RecordingHandler) -> Arc<RecordingHandler> {
    Arc::new(handler)
}
