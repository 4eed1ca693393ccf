use std::{str::FromStr, time::Duration};

use crate::server::error::config::ConfigError;

pub const DEFAULT_ACCOUNT_API_URL: &str = "https://api.guildwars2.com/v2";
pub const DEFAULT_PLATFORM_API_URL: &str = "https://discord.com/api/v10";
pub const DEFAULT_USER_AGENT: &str = concat!("wvwlink/", env!("CARGO_PKG_VERSION"));

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub account_api_url: String,
    pub user_agent: String,
    pub platform_api_url: String,
    pub platform_token: String,
    /// Account API requests allowed per sliding minute.
    pub rate_limit_per_minute: usize,
    pub workers: usize,
    /// Queue capacity is `workers * queue_depth_factor`.
    pub queue_depth_factor: usize,
    pub user_interval_ms: u64,
    pub min_sweep_interval_secs: u64,
    pub topology_retry_delay_secs: u64,
    pub topology_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            redis_url: required(&lookup, "REDIS_URL")?,
            account_api_url: lookup("ACCOUNT_API_URL")
                .unwrap_or_else(|| DEFAULT_ACCOUNT_API_URL.to_string()),
            user_agent: lookup("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            platform_api_url: lookup("PLATFORM_API_URL")
                .unwrap_or_else(|| DEFAULT_PLATFORM_API_URL.to_string()),
            platform_token: required(&lookup, "PLATFORM_TOKEN")?,
            rate_limit_per_minute: parsed(&lookup, "RATE_LIMIT_PER_MINUTE", 600)?,
            workers: parsed(&lookup, "WORKERS", 4)?,
            queue_depth_factor: parsed(&lookup, "QUEUE_DEPTH_FACTOR", 2)?,
            user_interval_ms: parsed(&lookup, "USER_INTERVAL_MS", 200)?,
            min_sweep_interval_secs: parsed(&lookup, "MIN_SWEEP_INTERVAL_SECS", 900)?,
            topology_retry_delay_secs: parsed(&lookup, "TOPOLOGY_RETRY_DELAY_SECS", 60)?,
            topology_max_attempts: parsed(&lookup, "TOPOLOGY_MAX_ATTEMPTS", 10)?,
        })
    }

    pub fn user_interval(&self) -> Duration {
        Duration::from_millis(self.user_interval_ms)
    }

    pub fn min_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.min_sweep_interval_secs)
    }

    pub fn topology_retry_delay(&self) -> Duration {
        Duration::from_secs(self.topology_retry_delay_secs)
    }
}

fn required<F>(lookup: &F, var: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}

fn parsed<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvValue {
                var: var.to_string(),
                reason: format!("{:?}: {}", raw, e),
            }),
    }
}
