//! Per-group synchronization policy document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a group maps worlds to roles.
///
/// Stored as an integer to stay compatible with documents written before the mode was named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mode {
    /// One role per world the user qualifies for.
    #[default]
    AllRealms,
    /// `WvW-Verified`/`WvW-Linked` against a configured target world.
    OneRealm,
    /// `WvW-Verified`/`WvW-Linked` against the world of the configured owner account.
    UserBased,
}

impl Mode {
    /// Whether the mode uses the two well-known verification roles.
    pub fn is_verification(&self) -> bool {
        matches!(self, Mode::OneRealm | Mode::UserBased)
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::AllRealms => 1,
            Mode::OneRealm => 2,
            Mode::UserBased => 3,
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            // 0 was written by builds that predate the mode setting
            0 | 1 => Ok(Mode::AllRealms),
            2 => Ok(Mode::OneRealm),
            3 => Ok(Mode::UserBased),
            other => Err(format!("unknown group mode {}", other)),
        }
    }
}

/// A world treated as linked to the target world until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraLinkedRealm {
    pub realm_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Synchronization settings of one group.
///
/// Created with [`GroupPolicy::default`] the first time the group is seen and only mutated
/// by the settings collaborator afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupPolicy {
    pub mode: Mode,
    #[serde(rename = "gw2ServerId")]
    pub target_realm_id: i64,
    #[serde(rename = "gw2AccountKey")]
    pub target_account_key: String,
    pub minimum_rank: i64,
    pub rename_users: bool,
    #[serde(rename = "createRoles")]
    pub create_all_realm_roles: bool,
    pub allow_linked: bool,
    pub verify_only: bool,
    #[serde(rename = "deleteLinked")]
    pub delete_linked_on_mismatch: bool,
    #[serde(rename = "extraLinked")]
    pub extra_linked_realm_ids: Vec<ExtraLinkedRealm>,
}

impl Default for GroupPolicy {
    fn default() -> Self {
        Self {
            mode: Mode::AllRealms,
            target_realm_id: 0,
            target_account_key: String::new(),
            minimum_rank: 0,
            rename_users: false,
            create_all_realm_roles: false,
            allow_linked: false,
            verify_only: false,
            delete_linked_on_mismatch: false,
            extra_linked_realm_ids: Vec::new(),
        }
    }
}

impl GroupPolicy {
    /// Extra linked worlds whose window has not closed at `now`.
    pub fn active_extra_links(&self, now: DateTime<Utc>) -> impl Iterator<Item = i64> + '_ {
        self.extra_linked_realm_ids
            .iter()
            .filter(move |extra| extra.expires_at > now)
            .map(|extra| extra.realm_id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(document: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(document)
    }
}
