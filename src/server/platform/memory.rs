use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::server::{
    error::platform::PlatformError,
    platform::{GroupPlatform, Member, PlatformRole},
};

#[derive(Debug, Default)]
struct GroupState {
    roles: Vec<PlatformRole>,
    members: BTreeMap<String, Member>,
}

/// In-process platform.
///
/// Every successful mutating call bumps [`MemoryPlatform::mutation_count`], which makes
/// idempotence directly observable.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    groups: Mutex<HashMap<String, GroupState>>,
    failing_role_names: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    mutations: AtomicUsize,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_group(&self, group_id: &str) {
        self.groups
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default();
    }

    pub async fn add_member(&self, group_id: &str, user_id: &str) {
        let mut groups = self.groups.lock().await;
        groups
            .entry(group_id.to_string())
            .or_default()
            .members
            .entry(user_id.to_string())
            .or_insert_with(|| Member {
                user_id: user_id.to_string(),
                ..Default::default()
            });
    }

    /// Creates a role directly, bypassing mutation tracking.
    pub async fn insert_role(&self, group_id: &str, name: &str, permissions: u64) -> String {
        let role = PlatformRole {
            id: self.allocate_id(),
            name: name.to_string(),
            permissions,
        };
        let id = role.id.clone();
        self.groups
            .lock()
            .await
            .entry(group_id.to_string())
            .or_default()
            .roles
            .push(role);
        id
    }

    /// Deletes a role and strips it from every member, as an administrator would.
    pub async fn delete_role(&self, group_id: &str, role_id: &str) {
        if let Some(group) = self.groups.lock().await.get_mut(group_id) {
            group.roles.retain(|role| role.id != role_id);
            for member in group.members.values_mut() {
                member.role_ids.retain(|id| id != role_id);
            }
        }
    }

    /// Assigns a role by name without counting it as a mutation.
    pub async fn grant(&self, group_id: &str, user_id: &str, role_name: &str) {
        let mut groups = self.groups.lock().await;
        let Some(group) = groups.get_mut(group_id) else {
            return;
        };
        let Some(role_id) = group
            .roles
            .iter()
            .find(|role| role.name == role_name)
            .map(|role| role.id.clone())
        else {
            return;
        };
        if let Some(member) = group.members.get_mut(user_id) {
            if !member.role_ids.contains(&role_id) {
                member.role_ids.push(role_id);
            }
        }
    }

    /// Makes every later `create_role` call for `name` fail.
    pub async fn fail_role_creation(&self, name: &str) {
        self.failing_role_names
            .lock()
            .await
            .insert(name.to_string());
    }

    /// Lets `create_role` calls for `name` succeed again.
    pub async fn allow_role_creation(&self, name: &str) {
        self.failing_role_names.lock().await.remove(name);
    }

    pub async fn member_role_names(&self, group_id: &str, user_id: &str) -> BTreeSet<String> {
        let groups = self.groups.lock().await;
        let Some(group) = groups.get(group_id) else {
            return BTreeSet::new();
        };
        let Some(member) = group.members.get(user_id) else {
            return BTreeSet::new();
        };
        group
            .roles
            .iter()
            .filter(|role| member.role_ids.contains(&role.id))
            .map(|role| role.name.clone())
            .collect()
    }

    pub async fn role_names(&self, group_id: &str) -> BTreeSet<String> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .map(|group| group.roles.iter().map(|role| role.name.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn nickname(&self, group_id: &str, user_id: &str) -> Option<String> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .and_then(|group| group.members.get(user_id))
            .and_then(|member| member.nickname.clone())
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

fn unknown_group(group_id: &str) -> PlatformError {
    PlatformError::UnknownGroup(group_id.to_string())
}

fn refused(operation: &'static str, reason: impl Into<String>) -> PlatformError {
    PlatformError::Request {
        operation,
        reason: reason.into(),
    }
}

#[async_trait]
impl GroupPlatform for MemoryPlatform {
    async fn list_roles(&self, group_id: &str) -> Result<Vec<PlatformRole>, PlatformError> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .map(|group| group.roles.clone())
            .ok_or_else(|| unknown_group(group_id))
    }

    async fn create_role(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<PlatformRole, PlatformError> {
        if self.failing_role_names.lock().await.contains(name) {
            return Err(refused("create_role", format!("role {} rejected", name)));
        }

        let mut groups = self.groups.lock().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| unknown_group(group_id))?;
        let role = PlatformRole {
            id: self.allocate_id(),
            name: name.to_string(),
            permissions: 0,
        };
        group.roles.push(role.clone());
        self.mutated();

        Ok(role)
    }

    async fn add_role(
        &self,
        group_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let mut groups = self.groups.lock().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| unknown_group(group_id))?;
        if !group.roles.iter().any(|role| role.id == role_id) {
            return Err(refused("add_role", format!("unknown role {}", role_id)));
        }
        let member = group
            .members
            .get_mut(user_id)
            .ok_or_else(|| refused("add_role", format!("unknown member {}", user_id)))?;
        if !member.role_ids.iter().any(|id| id == role_id) {
            member.role_ids.push(role_id.to_string());
        }
        self.mutated();

        Ok(())
    }

    async fn remove_role(
        &self,
        group_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        let mut groups = self.groups.lock().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| unknown_group(group_id))?;
        let member = group
            .members
            .get_mut(user_id)
            .ok_or_else(|| refused("remove_role", format!("unknown member {}", user_id)))?;
        member.role_ids.retain(|id| id != role_id);
        self.mutated();

        Ok(())
    }

    async fn get_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>, PlatformError> {
        let groups = self.groups.lock().await;
        let group = groups.get(group_id).ok_or_else(|| unknown_group(group_id))?;

        Ok(group.members.get(user_id).cloned())
    }

    async fn set_nickname(
        &self,
        group_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), PlatformError> {
        let mut groups = self.groups.lock().await;
        let group = groups
            .get_mut(group_id)
            .ok_or_else(|| unknown_group(group_id))?;
        let member = group
            .members
            .get_mut(user_id)
            .ok_or_else(|| refused("set_nickname", format!("unknown member {}", user_id)))?;
        member.nickname = Some(nickname.to_string());
        self.mutated();

        Ok(())
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<Member>, PlatformError> {
        self.groups
            .lock()
            .await
            .get(group_id)
            .map(|group| group.members.values().cloned().collect())
            .ok_or_else(|| unknown_group(group_id))
    }
}
