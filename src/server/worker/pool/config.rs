use std::time::Duration;

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Maximum work items processed simultaneously, the worker count.
    pub max_concurrent_jobs: usize,

    /// Number of dispatcher tasks that pull from the queue.
    ///
    /// Automatically calculated as 1 dispatcher per 40 concurrent jobs (minimum 1).
    pub dispatcher_count: usize,

    /// Work items running longer than this are reported (seconds). They are never cancelled.
    pub slow_job_warning_seconds: u64,

    /// Maximum time to wait for a dispatcher to shutdown (seconds).
    /// If a dispatcher doesn't stop within this time, a warning is logged.
    pub shutdown_timeout_seconds: u64,

    /// Maximum time to wait for in-flight work items during shutdown (seconds).
    pub drain_timeout_seconds: u64,
}

impl WorkerPoolConfig {
    /// Create a new configuration with sensible defaults
    ///
    /// # Arguments
    /// * `max_concurrent_jobs` - Number of workers
    pub fn new(max_concurrent_jobs: usize) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        // Scale dispatchers: 1 per 40 concurrent jobs, minimum 1
        let dispatcher_count = max_concurrent_jobs.div_ceil(40).max(1);

        Self {
            max_concurrent_jobs,
            dispatcher_count,
            slow_job_warning_seconds: 120,
            shutdown_timeout_seconds: 5,
            drain_timeout_seconds: 60,
        }
    }

    /// Get slow job threshold as Duration
    pub fn slow_job_warning(&self) -> Duration {
        Duration::from_secs(self.slow_job_warning_seconds)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    /// Get drain timeout as Duration
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::server::worker::pool::WorkerPoolConfig;

    #[test]
    fn test_default_config() {
        let config = WorkerPoolConfig::default();

        assert_eq!(
            config.max_concurrent_jobs, 4,
            "Default max_concurrent_jobs should be 4"
        );
        assert_eq!(
            config.dispatcher_count, 1,
            "Default dispatcher_count should be 1 (4 / 40 = 1, min 1)"
        );
        assert_eq!(config.slow_job_warning_seconds, 120);
        assert_eq!(config.shutdown_timeout_seconds, 5);
        assert_eq!(config.drain_timeout_seconds, 60);
    }

    #[test]
    fn test_dispatcher_scaling() {
        assert_eq!(WorkerPoolConfig::new(40).dispatcher_count, 1);
        assert_eq!(WorkerPoolConfig::new(41).dispatcher_count, 2);
        assert_eq!(WorkerPoolConfig::new(100).dispatcher_count, 3);
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        let config = WorkerPoolConfig::new(0);

        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.dispatcher_count, 1);
    }

    #[test]
    fn test_duration_conversions() {
        let mut config = WorkerPoolConfig::new(4);
        config.slow_job_warning_seconds = 30;
        config.shutdown_timeout_seconds = 2;
        config.drain_timeout_seconds = 10;

        assert_eq!(config.slow_job_warning(), Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(2));
        assert_eq!(config.drain_timeout(), Duration::from_secs(10));
    }
}
