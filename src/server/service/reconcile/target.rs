use std::time::Duration;

use entity::prelude::{GroupPolicy, Mode};

use crate::server::{
    error::{policy::PolicyError, Error},
    service::account::AccountClient,
};

/// Resolves the realm the verification modes compare against.
///
/// # Arguments
/// - `group_id` - Group the policy belongs to, for error reporting
/// - `policy` - Policy of the group
/// - `client` - Account client used to look up the owner account in `UserBased` mode
/// - `ttl` - Cache lifetime for the owner account lookup
///
/// # Returns
/// - `Ok(None)` - `AllRealms` mode, no target realm is needed
/// - `Ok(Some(realm_id))` - Realm of the target or the owner account
/// - `Err(Error::PolicyError)` - The policy lacks its target, or the owner account lookup
///   failed; the group is skipped
pub async fn resolve_target_realm(
    group_id: &str,
    policy: &GroupPolicy,
    client: &AccountClient,
    ttl: Duration,
) -> Result<Option<i64>, Error> {
    match policy.mode {
        Mode::AllRealms => Ok(None),
        Mode::OneRealm if policy.target_realm_id > 0 => Ok(Some(policy.target_realm_id)),
        Mode::OneRealm => Err(PolicyError::MissingTargetRealm(group_id.to_string()).into()),
        Mode::UserBased if policy.target_account_key.is_empty() => {
            Err(PolicyError::MissingTargetAccount(group_id.to_string()).into())
        }
        Mode::UserBased => {
            let owner = client
                .fetch_account_cached(&policy.target_account_key, ttl)
                .await
                .map_err(|source| PolicyError::OwnerAccountUnavailable {
                    group: group_id.to_string(),
                    source,
                })?;

            Ok(Some(owner.world))
        }
    }
}
