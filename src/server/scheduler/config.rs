use std::time::Duration;

use crate::server::config::Config;

/// Configuration for the update scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pacing between two work items of a sweep.
    pub user_interval: Duration,
    /// Lower bound of the spacing between two sweeps.
    pub min_sweep_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            user_interval: Duration::from_millis(200),
            min_sweep_interval: Duration::from_secs(15 * 60),
        }
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            user_interval: config.user_interval(),
            min_sweep_interval: config.min_sweep_interval(),
        }
    }
}
