//! Role view of one group during a reconciliation.

use std::collections::BTreeMap;

use entity::prelude::ManagedRole;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::server::{
    error::{platform::PlatformError, Error},
    platform::{GroupPlatform, PlatformRole},
    store::ManagedRoleStore,
};

/// Managed and live roles of a group.
///
/// Managed roles whose id no longer exists on the platform are dropped from the store when
/// the view is loaded. Role creation is serialized through `creation` so two workers never
/// create the same role.
pub struct GroupRoles<'a> {
    group_id: &'a str,
    platform: &'a dyn GroupPlatform,
    store: &'a dyn ManagedRoleStore,
    creation: &'a Mutex<()>,
    /// Managed roles by name.
    managed: BTreeMap<String, ManagedRole>,
    live: Vec<PlatformRole>,
}

impl<'a> GroupRoles<'a> {
    pub async fn load(
        group_id: &'a str,
        platform: &'a dyn GroupPlatform,
        store: &'a dyn ManagedRoleStore,
        creation: &'a Mutex<()>,
    ) -> Result<Self, Error> {
        let live = platform.list_roles(group_id).await?;
        let mut managed = BTreeMap::new();

        for role in store.list_managed(group_id).await? {
            if live.iter().any(|live_role| live_role.id == role.id) {
                managed.insert(role.name.clone(), role);
            } else {
                info!(
                    "Forgetting managed role {} ({}) of group {}, it no longer exists",
                    role.name, role.id, group_id
                );
                store.remove(group_id, &role).await?;
            }
        }

        Ok(Self {
            group_id,
            platform,
            store,
            creation,
            managed,
            live,
        })
    }

    /// Name of the managed role with id `role_id`.
    pub fn managed_name(&self, role_id: &str) -> Option<&str> {
        self.managed
            .values()
            .find(|role| role.id == role_id)
            .map(|role| role.name.as_str())
    }

    /// Finds the role named `name`, adopting or creating it when it is not managed yet.
    ///
    /// # Returns
    /// - `Ok(ManagedRole)` - The role, now tracked as managed
    /// - `Err(Error)` - A live role of that name carries elevated permissions, or creation
    ///   failed
    pub async fn resolve(&mut self, name: &str) -> Result<ManagedRole, Error> {
        if let Some(role) = self.managed.get(name) {
            return Ok(role.clone());
        }

        let role = match self.live.iter().find(|role| role.name == name) {
            Some(live) if live.is_adoptable() => {
                info!("Adopting role {} ({}) in group {}", name, live.id, self.group_id);
                ManagedRole::new(live.id.clone(), live.name.clone())
            }
            Some(_) => {
                return Err(PlatformError::RoleNotAdoptable {
                    group: self.group_id.to_string(),
                    name: name.to_string(),
                }
                .into())
            }
            None => {
                let _guard = self.creation.lock().await;

                // Another worker may have created it since this view was loaded
                let concurrent = self
                    .store
                    .list_managed(self.group_id)
                    .await?
                    .into_iter()
                    .find(|role| role.name == name);
                if let Some(role) = concurrent {
                    self.managed.insert(role.name.clone(), role.clone());
                    return Ok(role);
                }

                let created = self.platform.create_role(self.group_id, name).await?;
                info!(
                    "Created role {} ({}) in group {}",
                    name, created.id, self.group_id
                );
                let role = ManagedRole::new(created.id.clone(), created.name.clone());
                self.live.push(created);

                self.store.add(self.group_id, &role).await?;
                self.managed.insert(role.name.clone(), role.clone());
                return Ok(role);
            }
        };

        self.store.add(self.group_id, &role).await?;
        self.managed.insert(role.name.clone(), role.clone());
        debug!("Managing {} role(s) in group {}", self.managed.len(), self.group_id);

        Ok(role)
    }
}
