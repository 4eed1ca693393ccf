//! Engine assembly.
//!
//! Startup order matters: the store is migrated before anything reads it, the worker pool
//! runs before the scheduler's initial sweep fills the queue, and shutdown stops the
//! scheduler before the pool so no new items arrive while in-flight ones finish.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use migration::{Migrator, SchemaStore};
use tracing::info;

use crate::server::{
    config::Config,
    error::{account::AccountError, store::StoreError, Error},
    platform::GroupPlatform,
    scheduler::{SchedulerConfig, SchedulerHandle, SweepTiming, UpdateScheduler},
    service::{
        account::AccountClient,
        group::GroupService,
        key::KeyService,
        rate_limit::{RateLimiter, RateLimiterConfig},
        reconcile::Reconciler,
        topology::{TopologyConfig, WorldTopology},
        user::AccountResolver,
    },
    store::{KeyValueStore, RedisStore, UserStore},
    worker::{handler::WorkItemHandler, Worker},
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by the account API and platform clients.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client, Error> {
    let http = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(AccountError::Network)?;

    Ok(http)
}

/// Build the rate limited account API client.
pub fn build_account_client(config: &Config, http: reqwest::Client) -> AccountClient {
    let limiter = RateLimiter::new(RateLimiterConfig::per_minute(config.rate_limit_per_minute));

    AccountClient::new(http, &config.account_api_url, limiter)
}

/// Connect to Valkey/Redis for persistent state
pub async fn connect_to_store(config: &Config) -> Result<RedisStore, Error> {
    use fred::prelude::*;

    let redis_config = Config::from_url(&config.redis_url).map_err(StoreError::from)?;
    let pool = Pool::new(redis_config, None, None, None, 6).map_err(StoreError::from)?;

    pool.connect();
    pool.wait_for_connect().await.map_err(StoreError::from)?;

    Ok(RedisStore::new(pool))
}

/// Bring the store to the current schema version. Any error must abort startup.
pub async fn run_migrations(store: &dyn SchemaStore, client: &AccountClient) -> Result<i64, Error> {
    Ok(Migrator::up(store, client).await?)
}

/// The running synchronization engine.
pub struct Engine {
    users: Arc<dyn UserStore>,
    reconciler: Arc<Reconciler>,
    keys: KeyService,
    groups: GroupService,
    scheduler: SchedulerHandle,
    worker: Worker,
}

impl Engine {
    /// Connects to Redis and starts the engine on it.
    pub async fn start(config: &Config, platform: Arc<dyn GroupPlatform>) -> Result<Self, Error> {
        let http = build_http_client(config)?;
        let store = Arc::new(connect_to_store(config).await?);

        Self::start_with(config, store, platform, http).await
    }

    /// Starts the engine on the given store and platform.
    ///
    /// Returns once migrations, the initial topology refresh and the initial sweep are done.
    pub async fn start_with<S>(
        config: &Config,
        store: Arc<S>,
        platform: Arc<dyn GroupPlatform>,
        http: reqwest::Client,
    ) -> Result<Self, Error>
    where
        S: KeyValueStore + SchemaStore + 'static,
    {
        let client = build_account_client(config, http);

        let version = run_migrations(store.as_ref(), &client).await?;
        info!("Store is at schema version {}", version);

        let timing = SweepTiming::new(config.min_sweep_interval(), config.user_interval());
        let topology = WorldTopology::new(
            client.clone(),
            TopologyConfig {
                retry_delay: config.topology_retry_delay(),
                max_attempts: config.topology_max_attempts,
            },
        );
        let reconciler = Arc::new(Reconciler::new(platform, store.clone()));
        let resolver =
            AccountResolver::new(client.clone(), store.clone(), store.clone(), timing.clone());
        let handler = WorkItemHandler::new(
            resolver,
            reconciler.clone(),
            topology.clone(),
            store.clone(),
            client.clone(),
            timing.clone(),
        );

        let worker = Worker::new(config.workers, config.queue_depth_factor, Arc::new(handler));
        worker.pool.start().await?;

        let scheduler = UpdateScheduler::new(
            store.clone(),
            Arc::new(topology),
            worker.queue.clone(),
            timing,
            SchedulerConfig::from(config),
        )
        .with_cache(client.cache())
        .start()
        .await;

        let keys = KeyService::new(client, store.clone(), store.clone(), worker.queue.clone());
        let groups = GroupService::new(store.clone(), worker.queue.clone(), scheduler.clone());

        info!("Engine started with {} worker(s)", config.workers);

        Ok(Self {
            users: store,
            reconciler,
            keys,
            groups,
            scheduler,
            worker,
        })
    }

    pub fn keys(&self) -> &KeyService {
        &self.keys
    }

    pub fn groups(&self) -> &GroupService {
        &self.groups
    }

    /// Refresh everyone as soon as possible.
    pub fn request_sweep(&self) {
        self.scheduler.request_sweep();
    }

    /// Strips managed roles from members of `group_id` without any registered key.
    pub async fn purge_group(&self, group_id: &str, linked_only: bool) -> Result<usize, Error> {
        let linked: BTreeSet<String> = self.users.list_all_user_ids().await?.into_iter().collect();

        self.reconciler
            .purge_group(group_id, &linked, linked_only)
            .await
    }

    /// Stops the scheduler, then waits for in-flight work items.
    pub async fn shutdown(self) -> Result<(), Error> {
        info!("Shutting down engine");

        self.scheduler.stop().await;
        self.worker.pool.stop().await?;

        Ok(())
    }
}
