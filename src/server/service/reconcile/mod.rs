//! Role reconciliation.
//!
//! For one user in one group the [`Reconciler`] computes the wanted role names from the
//! group policy, compares them with the managed roles the member holds, and applies the
//! difference. Only managed roles are ever removed and removals are skipped entirely when the
//! account lookup was incomplete. Running it twice with unchanged inputs changes nothing the
//! second time.

mod roles;
mod target;
pub mod wanted;

#[cfg(test)]
mod tests;

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    sync::Arc,
};

use chrono::Utc;
use entity::prelude::GroupPolicy;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::server::{
    error::Error,
    model::{reconcile::ReconcileOutcome, topology::Topology, user::ResolvedAccounts},
    platform::GroupPlatform,
    store::ManagedRoleStore,
};

pub use roles::GroupRoles;
pub use target::resolve_target_realm;
pub use wanted::{LINKED_ROLE, VERIFIED_ROLE};

pub struct Reconciler {
    platform: Arc<dyn GroupPlatform>,
    roles: Arc<dyn ManagedRoleStore>,
    /// Groups whose realm roles were provisioned, per topology generation.
    provisioned: Mutex<HashSet<(String, u64)>>,
    role_creation: Mutex<()>,
}

impl Reconciler {
    pub fn new(platform: Arc<dyn GroupPlatform>, roles: Arc<dyn ManagedRoleStore>) -> Self {
        Self {
            platform,
            roles,
            provisioned: Mutex::new(HashSet::new()),
            role_creation: Mutex::new(()),
        }
    }

    pub fn platform(&self) -> &Arc<dyn GroupPlatform> {
        &self.platform
    }

    /// Brings the managed roles and nickname of `user_id` in `group_id` in line with `policy`.
    ///
    /// A role that cannot be resolved or assigned is reported in
    /// [`ReconcileOutcome::failed`] and does not stop the remaining roles.
    ///
    /// # Arguments
    /// - `group_id` - Group to reconcile in
    /// - `user_id` - Member to reconcile
    /// - `policy` - Policy of the group
    /// - `target_realm` - Target realm from [`resolve_target_realm`]
    /// - `resolved` - The user's accounts and whether removals are safe
    /// - `topology` - Realm topology snapshot
    ///
    /// # Returns
    /// - `Ok(ReconcileOutcome)` - What changed; skipped if the user is not a member
    /// - `Err(Error)` - The member or role listing failed, nothing was changed
    pub async fn reconcile(
        &self,
        group_id: &str,
        user_id: &str,
        policy: &GroupPolicy,
        target_realm: Option<i64>,
        resolved: &ResolvedAccounts,
        topology: &Topology,
    ) -> Result<ReconcileOutcome, Error> {
        let Some(member) = self.platform.get_member(group_id, user_id).await? else {
            debug!("User {} is not a member of group {}", user_id, group_id);
            return Ok(ReconcileOutcome::not_a_member());
        };

        let mut roles = self.load_roles(group_id).await?;
        let mut outcome = ReconcileOutcome::default();

        self.provision(group_id, policy, topology, &mut roles).await;

        let wanted =
            wanted::wanted_role_names(policy, target_realm, &resolved.data, topology, Utc::now());

        let held: BTreeMap<String, String> = member
            .role_ids
            .iter()
            .filter_map(|role_id| {
                roles
                    .managed_name(role_id)
                    .map(|name| (name.to_string(), role_id.clone()))
            })
            .collect();

        if resolved.may_remove {
            for (name, role_id) in &held {
                if wanted.contains(name) || wanted::keeps_unwanted(policy, name, &wanted) {
                    continue;
                }

                match self.platform.remove_role(group_id, user_id, role_id).await {
                    Ok(()) => outcome.removed.push(name.clone()),
                    Err(e) => warn!(
                        "Failed to remove role {} from user {} in group {}: {}",
                        name, user_id, group_id, e
                    ),
                }
            }
        }

        for name in wanted.iter().filter(|name| !held.contains_key(*name)) {
            let role = match roles.resolve(name).await {
                Ok(role) => role,
                Err(e) => {
                    warn!(
                        "Skipping role {} for user {} in group {}: {}",
                        name, user_id, group_id, e
                    );
                    outcome.failed.push(name.clone());
                    continue;
                }
            };

            // Adopted roles may already be held
            if member.role_ids.contains(&role.id) {
                continue;
            }

            match self.platform.add_role(group_id, user_id, &role.id).await {
                Ok(()) => outcome.added.push(name.clone()),
                Err(e) => {
                    warn!(
                        "Failed to add role {} to user {} in group {}: {}",
                        name, user_id, group_id, e
                    );
                    outcome.failed.push(name.clone());
                }
            }
        }

        outcome.renamed = self
            .sync_nickname(group_id, user_id, policy, resolved, member.nickname.as_deref())
            .await;

        debug!(
            "Reconciled user {} in group {}: added {:?}, removed {:?}, failed {:?}",
            user_id, group_id, outcome.added, outcome.removed, outcome.failed
        );

        Ok(outcome)
    }

    async fn load_roles<'a>(&'a self, group_id: &'a str) -> Result<GroupRoles<'a>, Error> {
        GroupRoles::load(
            group_id,
            self.platform.as_ref(),
            self.roles.as_ref(),
            &self.role_creation,
        )
        .await
    }

    /// Creates a role for every realm once per topology generation, when the policy asks for it.
    ///
    /// A group only counts as provisioned once every role resolved.
    async fn provision(
        &self,
        group_id: &str,
        policy: &GroupPolicy,
        topology: &Topology,
        roles: &mut GroupRoles<'_>,
    ) {
        let names = wanted::provisioned_role_names(policy, topology);
        if names.is_empty() {
            return;
        }

        let entry = (group_id.to_string(), topology.generation);
        let mut provisioned = self.provisioned.lock().await;
        if provisioned.contains(&entry) {
            return;
        }

        let mut complete = true;
        for name in &names {
            if let Err(e) = roles.resolve(name).await {
                warn!(
                    "Failed to provision role {} in group {}: {}",
                    name, group_id, e
                );
                complete = false;
            }
        }

        // Incomplete provisioning is retried by the next reconcile
        if complete {
            provisioned.retain(|(_, generation)| *generation >= topology.generation);
            provisioned.insert(entry);
        }
    }

    async fn sync_nickname(
        &self,
        group_id: &str,
        user_id: &str,
        policy: &GroupPolicy,
        resolved: &ResolvedAccounts,
        current: Option<&str>,
    ) -> bool {
        let name = resolved.data.display_name.as_str();

        // An incomplete lookup yields an incomplete name
        if !policy.rename_users || !resolved.may_remove || name.is_empty() || current == Some(name)
        {
            return false;
        }

        match self.platform.set_nickname(group_id, user_id, name).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to rename user {} in group {}: {}",
                    user_id, group_id, e
                );
                false
            }
        }
    }

    /// Strips managed roles from every member of `group_id` that is not in `linked_users`.
    ///
    /// # Arguments
    /// - `group_id` - Group to purge
    /// - `linked_users` - Users that currently have at least one key
    /// - `linked_only` - Only strip the [`LINKED_ROLE`]
    ///
    /// # Returns
    /// - `Ok(usize)` - Number of role removals
    /// - `Err(Error)` - The member or role listing failed
    pub async fn purge_group(
        &self,
        group_id: &str,
        linked_users: &BTreeSet<String>,
        linked_only: bool,
    ) -> Result<usize, Error> {
        let roles = self.load_roles(group_id).await?;
        let members = self.platform.list_members(group_id).await?;
        let mut removed = 0;

        for member in members
            .iter()
            .filter(|member| !linked_users.contains(&member.user_id))
        {
            for role_id in &member.role_ids {
                let Some(name) = roles.managed_name(role_id) else {
                    continue;
                };
                if linked_only && name != LINKED_ROLE {
                    continue;
                }

                match self
                    .platform
                    .remove_role(group_id, &member.user_id, role_id)
                    .await
                {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(
                        "Failed to purge role {} from user {} in group {}: {}",
                        name, member.user_id, group_id, e
                    ),
                }
            }
        }

        debug!("Purged {} role assignment(s) in group {}", removed, group_id);

        Ok(removed)
    }
}
