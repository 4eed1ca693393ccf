//! Persistence for users, group policies, managed roles and the account index.
//!
//! Backends implement the raw [`KeyValueStore`] primitives over the namespaced layout in
//! [`entity::layout`]; the domain traits the engine talks to are implemented once on top of
//! them.

pub mod memory;
pub mod redis;
mod schema;

use async_trait::async_trait;
use entity::prelude::{GroupPolicy, ManagedRole, Namespace, LEGACY_GUILDS_KEY};
use tracing::warn;

use crate::server::error::store::StoreError;

pub use memory::MemoryStore;
pub use redis::RedisStore;

/// Raw primitives over strings and string sets, keyed by namespace.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError>;
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError>;
    /// Writes `value` only when the key does not exist yet.
    ///
    /// # Returns
    /// - `Ok(true)` - The value was written
    /// - `Ok(false)` - The key already existed, nothing changed
    async fn set_if_absent(
        &self,
        namespace: Namespace,
        key: &str,
        value: &str,
    ) -> Result<bool, StoreError>;
    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), StoreError>;
    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError>;
    async fn members(&self, namespace: Namespace, key: &str) -> Result<Vec<String>, StoreError>;
    async fn add_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError>;
    async fn remove_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError>;
    async fn move_key(&self, from: Namespace, to: Namespace, key: &str)
        -> Result<(), StoreError>;
}

/// API keys per user.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_all_user_ids(&self) -> Result<Vec<String>, StoreError>;
    async fn get_keys_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
    async fn add_key(&self, user_id: &str, key: &str) -> Result<(), StoreError>;
    async fn remove_key(&self, user_id: &str, key: &str) -> Result<(), StoreError>;
    async fn remove_user(&self, user_id: &str) -> Result<(), StoreError>;
}

/// One [`GroupPolicy`] document per group.
#[async_trait]
pub trait GroupSettingsStore: Send + Sync {
    /// Returns `None` for groups that were never set up.
    async fn get(&self, group_id: &str) -> Result<Option<GroupPolicy>, StoreError>;
    async fn put(&self, group_id: &str, policy: &GroupPolicy) -> Result<(), StoreError>;
    async fn exists(&self, group_id: &str) -> Result<bool, StoreError>;
    async fn list_groups(&self) -> Result<Vec<String>, StoreError>;
}

/// Roles the engine created or adopted, per group.
#[async_trait]
pub trait ManagedRoleStore: Send + Sync {
    async fn list_managed(&self, group_id: &str) -> Result<Vec<ManagedRole>, StoreError>;
    async fn add(&self, group_id: &str, role: &ManagedRole) -> Result<(), StoreError>;
    async fn remove(&self, group_id: &str, role: &ManagedRole) -> Result<(), StoreError>;
}

/// Outcome of claiming an account for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The account was unclaimed and now belongs to the user.
    Claimed,
    /// The user already owned the account.
    AlreadyOwned,
    /// Another user owns the account; nothing changed.
    TakenBy(String),
    /// A forced claim moved the account away from `previous`.
    Reassigned { previous: String },
}

/// Account id to owning user id; an account is linked to at most one user.
#[async_trait]
pub trait AccountIndex: Send + Sync {
    async fn owner_of(&self, account_id: &str) -> Result<Option<String>, StoreError>;
    /// Claims `account_id` for `user_id`; `force` takes it over from another user.
    async fn claim(
        &self,
        account_id: &str,
        user_id: &str,
        force: bool,
    ) -> Result<ClaimOutcome, StoreError>;
    /// Releases every account owned by `user_id`, returning how many were released.
    async fn release_all_for(&self, user_id: &str) -> Result<usize, StoreError>;
}

#[async_trait]
impl<T: KeyValueStore> UserStore for T {
    async fn list_all_user_ids(&self) -> Result<Vec<String>, StoreError> {
        self.keys(Namespace::Users).await
    }

    async fn get_keys_for_user(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.members(Namespace::Users, user_id).await
    }

    async fn add_key(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        self.add_member(Namespace::Users, user_id, key).await?;

        Ok(())
    }

    async fn remove_key(&self, user_id: &str, key: &str) -> Result<(), StoreError> {
        self.remove_member(Namespace::Users, user_id, key).await?;

        Ok(())
    }

    async fn remove_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.delete(Namespace::Users, user_id).await
    }
}

#[async_trait]
impl<T: KeyValueStore> GroupSettingsStore for T {
    async fn get(&self, group_id: &str) -> Result<Option<GroupPolicy>, StoreError> {
        let Some(raw) = KeyValueStore::get(self, Namespace::Guilds, group_id).await? else {
            return Ok(None);
        };

        GroupPolicy::from_json(&raw)
            .map(Some)
            .map_err(|source| StoreError::Document {
                namespace: Namespace::Guilds,
                key: group_id.to_string(),
                source,
            })
    }

    async fn put(&self, group_id: &str, policy: &GroupPolicy) -> Result<(), StoreError> {
        let raw = policy.to_json().map_err(|source| StoreError::Document {
            namespace: Namespace::Guilds,
            key: group_id.to_string(),
            source,
        })?;

        self.set(Namespace::Guilds, group_id, &raw).await
    }

    async fn exists(&self, group_id: &str) -> Result<bool, StoreError> {
        KeyValueStore::exists(self, Namespace::Guilds, group_id).await
    }

    async fn list_groups(&self) -> Result<Vec<String>, StoreError> {
        let mut groups = self.keys(Namespace::Guilds).await?;
        groups.retain(|group| group != LEGACY_GUILDS_KEY);

        Ok(groups)
    }
}

#[async_trait]
impl<T: KeyValueStore> ManagedRoleStore for T {
    async fn list_managed(&self, group_id: &str) -> Result<Vec<ManagedRole>, StoreError> {
        let raw = self.members(Namespace::Roles, group_id).await?;

        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<ManagedRole>(entry) {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(
                        "Ignoring unreadable managed role entry in group {}: {}",
                        group_id, e
                    );
                    None
                }
            })
            .collect())
    }

    async fn add(&self, group_id: &str, role: &ManagedRole) -> Result<(), StoreError> {
        self.add_member(Namespace::Roles, group_id, &encode_role(group_id, role)?)
            .await?;

        Ok(())
    }

    async fn remove(&self, group_id: &str, role: &ManagedRole) -> Result<(), StoreError> {
        self.remove_member(Namespace::Roles, group_id, &encode_role(group_id, role)?)
            .await?;

        Ok(())
    }
}

fn encode_role(group_id: &str, role: &ManagedRole) -> Result<String, StoreError> {
    serde_json::to_string(role).map_err(|source| StoreError::Document {
        namespace: Namespace::Roles,
        key: group_id.to_string(),
        source,
    })
}

#[async_trait]
impl<T: KeyValueStore> AccountIndex for T {
    async fn owner_of(&self, account_id: &str) -> Result<Option<String>, StoreError> {
        KeyValueStore::get(self, Namespace::Unique, account_id).await
    }

    async fn claim(
        &self,
        account_id: &str,
        user_id: &str,
        force: bool,
    ) -> Result<ClaimOutcome, StoreError> {
        if self
            .set_if_absent(Namespace::Unique, account_id, user_id)
            .await?
        {
            return Ok(ClaimOutcome::Claimed);
        }

        match self.owner_of(account_id).await? {
            Some(owner) if owner == user_id => Ok(ClaimOutcome::AlreadyOwned),
            Some(owner) if force => {
                self.set(Namespace::Unique, account_id, user_id).await?;
                Ok(ClaimOutcome::Reassigned { previous: owner })
            }
            Some(owner) => Ok(ClaimOutcome::TakenBy(owner)),
            // Released between the two calls
            None => {
                self.set(Namespace::Unique, account_id, user_id).await?;
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    async fn release_all_for(&self, user_id: &str) -> Result<usize, StoreError> {
        let mut released = 0;
        for account_id in self.keys(Namespace::Unique).await? {
            if self.owner_of(&account_id).await?.as_deref() == Some(user_id) {
                self.delete(Namespace::Unique, &account_id).await?;
                released += 1;
            }
        }

        Ok(released)
    }
}
