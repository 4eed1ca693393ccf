//! Response shapes of the account API. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Account behind an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account identifier, used for the account uniqueness index.
    pub id: String,
    pub name: String,
    /// Realm the account is a member of.
    pub world: i64,
    /// Only reported when the key grants the `progression` permission.
    #[serde(default)]
    pub wvw_rank: i64,
}

/// Catalog entry of a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub id: i64,
    pub name: String,
}

/// Every realm fighting on one side of a match, host realm first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSides {
    #[serde(default)]
    pub red: Vec<i64>,
    #[serde(default)]
    pub blue: Vec<i64>,
    #[serde(default)]
    pub green: Vec<i64>,
}

impl MatchSides {
    pub fn sides(&self) -> [&[i64]; 3] {
        [&self.red, &self.blue, &self.green]
    }
}

/// Current match overview, only `all_worlds` is used to derive realm links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOverview {
    pub id: String,
    pub all_worlds: MatchSides,
}

/// Metadata of an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl TokenInfo {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
