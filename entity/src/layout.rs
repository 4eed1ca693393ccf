//! Key-value layout of the persisted schema.
//!
//! | version | layout                                                                  |
//! |---------|-------------------------------------------------------------------------|
//! | 1       | user key sets and the `guilds` set all live in the version namespace    |
//! | 2       | user key sets in `users`, `guilds` set in `guilds`                      |
//! | 3       | one [`GroupPolicy`](crate::group_policy::GroupPolicy) document per group |
//! | 4       | `unique` maps account id to the owning user id                          |
//! | 5       | every policy document carries `minimumRank`                             |

use std::fmt;

/// Key holding the schema version inside [`Namespace::Version`].
pub const VERSION_KEY: &str = "version";

/// Set of group ids used by schema versions 1 and 2.
pub const LEGACY_GUILDS_KEY: &str = "guilds";

/// Version written after the last migration step.
pub const CURRENT_SCHEMA_VERSION: i64 = 5;

/// Logical database a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    Version,
    Guilds,
    Users,
    Unique,
    Roles,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Version => "version",
            Namespace::Guilds => "guilds",
            Namespace::Users => "users",
            Namespace::Unique => "unique",
            Namespace::Roles => "roles",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
