//! Work item definitions for per-user refreshes.

use std::fmt;

/// One refresh request for a user.
///
/// Items are only ever queued in memory, the scheduler re-derives them from the user store
/// after a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub user_id: String,
    /// Restrict reconciliation to this group; `None` means every known group.
    pub group_id: Option<String>,
    /// Bypass the account cache and retry transient fetch failures.
    pub force_sync: bool,
}

impl WorkItem {
    /// Item emitted by a full sweep.
    pub fn sweep(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: None,
            force_sync: false,
        }
    }

    /// Item emitted right after a user registered a key.
    pub fn forced(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: None,
            force_sync: true,
        }
    }

    /// Item emitted when a user joined a group.
    pub fn for_group(user_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: Some(group_id.into()),
            force_sync: false,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refresh user {}", self.user_id)?;
        if let Some(group_id) = &self.group_id {
            write!(f, " in group {}", group_id)?;
        }
        if self.force_sync {
            write!(f, " (forced)")?;
        }
        Ok(())
    }
}
