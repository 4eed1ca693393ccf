//! Group-membership platform the engine assigns roles on.
//!
//! The engine only needs a handful of operations, captured by [`GroupPlatform`]. The
//! [`http::HttpPlatform`] talks to a Discord-compatible REST API, [`memory::MemoryPlatform`]
//! keeps everything in process and records every mutation.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::server::error::platform::PlatformError;

pub const PERMISSION_KICK_MEMBERS: u64 = 1 << 1;
pub const PERMISSION_BAN_MEMBERS: u64 = 1 << 2;
pub const PERMISSION_ADMINISTRATOR: u64 = 1 << 3;
pub const PERMISSION_MANAGE_CHANNELS: u64 = 1 << 4;
pub const PERMISSION_MANAGE_GUILD: u64 = 1 << 5;
pub const PERMISSION_MANAGE_MESSAGES: u64 = 1 << 13;
pub const PERMISSION_MANAGE_ROLES: u64 = 1 << 28;
pub const PERMISSION_MANAGE_WEBHOOKS: u64 = 1 << 29;

/// Permissions that make a live role unsuitable for adoption.
pub const ELEVATED_PERMISSIONS: u64 = PERMISSION_KICK_MEMBERS
    | PERMISSION_BAN_MEMBERS
    | PERMISSION_ADMINISTRATOR
    | PERMISSION_MANAGE_CHANNELS
    | PERMISSION_MANAGE_GUILD
    | PERMISSION_MANAGE_MESSAGES
    | PERMISSION_MANAGE_ROLES
    | PERMISSION_MANAGE_WEBHOOKS;

/// A role as it exists on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRole {
    pub id: String,
    pub name: String,
    pub permissions: u64,
}

impl PlatformRole {
    /// Roles without elevated permissions may be taken over by the engine.
    pub fn is_adoptable(&self) -> bool {
        self.permissions & ELEVATED_PERMISSIONS == 0
    }
}

/// A member of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member {
    pub user_id: String,
    /// Ids of the roles the member holds.
    pub role_ids: Vec<String>,
    pub nickname: Option<String>,
}

#[async_trait]
pub trait GroupPlatform: Send + Sync {
    async fn list_roles(&self, group_id: &str) -> Result<Vec<PlatformRole>, PlatformError>;

    /// Creates a role without any permissions.
    async fn create_role(&self, group_id: &str, name: &str)
        -> Result<PlatformRole, PlatformError>;

    async fn add_role(
        &self,
        group_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_role(
        &self,
        group_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    /// Returns `None` when the user is not a member of the group.
    async fn get_member(&self, group_id: &str, user_id: &str)
        -> Result<Option<Member>, PlatformError>;

    async fn set_nickname(
        &self,
        group_id: &str,
        user_id: &str,
        nickname: &str,
    ) -> Result<(), PlatformError>;

    async fn list_members(&self, group_id: &str) -> Result<Vec<Member>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_roles_are_not_adoptable() {
        let plain = PlatformRole {
            id: "1".to_string(),
            name: "Plain".to_string(),
            permissions: 0x400,
        };
        let moderator = PlatformRole {
            id: "2".to_string(),
            name: "Moderator".to_string(),
            permissions: PERMISSION_KICK_MEMBERS | 0x400,
        };

        assert!(plain.is_adoptable());
        assert!(!moderator.is_adoptable());
    }
}
