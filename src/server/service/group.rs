//! Group lifecycle events.

use std::sync::Arc;

use entity::prelude::GroupPolicy;
use tracing::info;

use crate::server::{
    error::Error,
    model::worker::WorkItem,
    scheduler::SchedulerHandle,
    store::GroupSettingsStore,
    worker::queue::WorkerQueue,
};

pub struct GroupService {
    settings: Arc<dyn GroupSettingsStore>,
    queue: WorkerQueue,
    scheduler: SchedulerHandle,
}

impl GroupService {
    pub fn new(
        settings: Arc<dyn GroupSettingsStore>,
        queue: WorkerQueue,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            settings,
            queue,
            scheduler,
        }
    }

    /// Sets up a group the engine was added to.
    ///
    /// A group seen for the first time gets the default policy; either way a full sweep is
    /// requested so its members are picked up.
    ///
    /// # Returns
    /// - `Ok(true)` - The group was new and its default policy was stored
    /// - `Ok(false)` - The group already had a policy
    pub async fn on_group_joined(&self, group_id: &str) -> Result<bool, Error> {
        let created = if self.settings.exists(group_id).await? {
            false
        } else {
            self.settings.put(group_id, &GroupPolicy::default()).await?;
            info!("Created default policy for new group {}", group_id);
            true
        };

        self.scheduler.request_sweep();

        Ok(created)
    }

    /// The engine was removed from a group. The policy is kept for a later return.
    pub fn on_group_left(&self, group_id: &str) {
        info!("Removed from group {}, keeping its policy", group_id);
    }

    /// Queues a refresh of `user_id` restricted to the group they just joined.
    pub async fn on_member_joined(&self, group_id: &str, user_id: &str) -> Result<(), Error> {
        self.queue
            .push(WorkItem::for_group(user_id, group_id))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use entity::prelude::Mode;

    use super::*;
    use crate::server::{
        scheduler::{SchedulerConfig, SweepTiming, UpdateScheduler},
        service::topology::TopologyRefresher,
        store::MemoryStore,
        worker::queue::WorkerQueueConfig,
    };

    struct NoTopology;

    #[async_trait]
    impl TopologyRefresher for NoTopology {
        async fn refresh(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    async fn service(store: Arc<MemoryStore>, queue: WorkerQueue) -> GroupService {
        let config = SchedulerConfig::default();
        let timing = SweepTiming::new(config.min_sweep_interval, config.user_interval);
        let scheduler = UpdateScheduler::new(
            store.clone(),
            Arc::new(NoTopology),
            queue.clone(),
            timing,
            config,
        )
        .start()
        .await;

        GroupService::new(store, queue, scheduler)
    }

    #[tokio::test]
    async fn first_join_creates_default_policy() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let groups = service(store.clone(), WorkerQueue::new(WorkerQueueConfig::new(2))).await;

        assert!(groups.on_group_joined("g1").await?);
        assert_eq!(
            GroupSettingsStore::get(store.as_ref(), "g1").await?,
            Some(GroupPolicy::default())
        );

        Ok(())
    }

    #[tokio::test]
    async fn rejoin_keeps_existing_policy() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let groups = service(store.clone(), WorkerQueue::new(WorkerQueueConfig::new(2))).await;
        let policy = GroupPolicy {
            mode: Mode::OneRealm,
            target_realm_id: 1001,
            ..GroupPolicy::default()
        };
        GroupSettingsStore::put(store.as_ref(), "g1", &policy).await?;

        groups.on_group_left("g1");
        assert!(!groups.on_group_joined("g1").await?);

        assert_eq!(
            GroupSettingsStore::get(store.as_ref(), "g1").await?,
            Some(policy)
        );

        Ok(())
    }

    #[tokio::test]
    async fn member_join_queues_group_refresh() -> Result<(), Error> {
        let store = Arc::new(MemoryStore::new());
        let queue = WorkerQueue::new(WorkerQueueConfig::new(2));
        let groups = service(store, queue.clone()).await;

        groups.on_member_joined("g1", "alice").await?;

        assert_eq!(queue.pop().await, Some(WorkItem::for_group("alice", "g1")));

        Ok(())
    }
}
