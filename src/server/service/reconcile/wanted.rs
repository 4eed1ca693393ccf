//! Wanted role names for one user in one group.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use entity::prelude::{GroupPolicy, Mode};

use crate::server::model::{topology::Topology, user::UserAccountData};

/// Role of users on the target realm in the verification modes.
pub const VERIFIED_ROLE: &str = "WvW-Verified";
/// Role of users on a realm linked to the target realm in the verification modes.
pub const LINKED_ROLE: &str = "WvW-Linked";

/// Computes the role names a user should hold in a group.
///
/// # Arguments
/// - `policy` - Policy of the group
/// - `target_realm` - Resolved target realm, only used by the verification modes
/// - `data` - The user's aggregated accounts
/// - `topology` - Snapshot used for realm names and links
/// - `now` - Reference time for time-boxed extra links
pub fn wanted_role_names(
    policy: &GroupPolicy,
    target_realm: Option<i64>,
    data: &UserAccountData,
    topology: &Topology,
    now: DateTime<Utc>,
) -> BTreeSet<String> {
    let realms = data.qualifying_realms(policy.minimum_rank);

    if policy.mode == Mode::AllRealms {
        return realms
            .iter()
            .filter_map(|realm_id| topology.name_of(*realm_id))
            .map(str::to_string)
            .collect();
    }

    let Some(target) = target_realm else {
        return BTreeSet::new();
    };

    if realms.contains(&target) {
        return BTreeSet::from([VERIFIED_ROLE.to_string()]);
    }

    if policy.allow_linked {
        let linked: BTreeSet<i64> = topology
            .linked_to(target)
            .chain(policy.active_extra_links(now))
            .collect();

        if !realms.is_disjoint(&linked) {
            let role = if policy.verify_only {
                VERIFIED_ROLE
            } else {
                LINKED_ROLE
            };
            return BTreeSet::from([role.to_string()]);
        }
    }

    BTreeSet::new()
}

/// Role names provisioned in a group regardless of its members.
pub fn provisioned_role_names(policy: &GroupPolicy, topology: &Topology) -> BTreeSet<String> {
    if policy.mode == Mode::AllRealms && policy.create_all_realm_roles {
        topology.realm_names().map(str::to_string).collect()
    } else {
        BTreeSet::new()
    }
}

/// Whether a held managed role survives even though it is not wanted.
///
/// A `Linked` role outlives a lost link unless the group deletes it on mismatch; admins clear
/// it with a purge. A user promoted to `Verified` loses it.
pub fn keeps_unwanted(policy: &GroupPolicy, name: &str, wanted: &BTreeSet<String>) -> bool {
    policy.mode.is_verification()
        && name == LINKED_ROLE
        && !policy.delete_linked_on_mismatch
        && wanted.is_empty()
}
