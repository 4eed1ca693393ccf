use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::server::{
    error::Error,
    model::{topology::Topology, user::ResolvedAccounts, worker::WorkItem},
    scheduler::SweepTiming,
    service::{
        account::AccountClient,
        reconcile::{resolve_target_realm, Reconciler},
        topology::WorldTopology,
        user::AccountResolver,
    },
    store::GroupSettingsStore,
};

/// Executes a single work item for the worker pool.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, item: &WorkItem) -> Result<(), Error>;
}

/// Refreshes one user: account lookup first, then reconciliation per group.
///
/// Errors of a single group are logged and do not affect the user's other groups.
pub struct WorkItemHandler {
    resolver: AccountResolver,
    reconciler: Arc<Reconciler>,
    topology: WorldTopology,
    settings: Arc<dyn GroupSettingsStore>,
    client: AccountClient,
    timing: SweepTiming,
}

impl WorkItemHandler {
    pub fn new(
        resolver: AccountResolver,
        reconciler: Arc<Reconciler>,
        topology: WorldTopology,
        settings: Arc<dyn GroupSettingsStore>,
        client: AccountClient,
        timing: SweepTiming,
    ) -> Self {
        Self {
            resolver,
            reconciler,
            topology,
            settings,
            client,
            timing,
        }
    }

    async fn sync_group(
        &self,
        group_id: &str,
        user_id: &str,
        resolved: &ResolvedAccounts,
        topology: &Topology,
    ) -> Result<(), Error> {
        let Some(policy) = self.settings.get(group_id).await? else {
            debug!("Group {} has no policy, skipping", group_id);
            return Ok(());
        };

        let target_realm =
            resolve_target_realm(group_id, &policy, &self.client, self.timing.cache_ttl()).await?;

        let outcome = self
            .reconciler
            .reconcile(group_id, user_id, &policy, target_realm, resolved, topology)
            .await?;

        if !outcome.is_noop() {
            info!(
                "Updated user {} in group {}: added {:?}, removed {:?}",
                user_id, group_id, outcome.added, outcome.removed
            );
        }

        Ok(())
    }
}

#[async_trait]
impl JobHandler for WorkItemHandler {
    async fn handle(&self, item: &WorkItem) -> Result<(), Error> {
        debug!("Processing {}", item);

        let mut resolved = self.resolver.resolve(&item.user_id, item.force_sync).await?;

        let topology = self.topology.snapshot().await;
        if topology.is_empty() {
            // Without realm names every realm role would look unwanted
            resolved.may_remove = false;
        }

        let groups = match &item.group_id {
            Some(group_id) => vec![group_id.clone()],
            None => self.settings.list_groups().await?,
        };

        for group_id in &groups {
            if let Err(e) = self
                .sync_group(group_id, &item.user_id, &resolved, &topology)
                .await
            {
                warn!(
                    "Skipping group {} for user {}: {}",
                    group_id, item.user_id, e
                );
            }
        }

        Ok(())
    }
}
