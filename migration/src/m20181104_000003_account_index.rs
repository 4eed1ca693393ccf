use entity::prelude::Namespace;

use crate::{async_trait, LookupOutcome, MigrationError, MigrationTrait, SchemaManager};

/// Builds the account id to user id index.
///
/// Keys are visited user by user; the first user seen holding an account claims it. Keys of
/// later users resolving to an already claimed account are removed, as are keys the account
/// API reports as invalid. Keys that cannot be resolved right now are kept untouched.
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "account_index"
    }

    fn from_version(&self) -> i64 {
        3
    }

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<(), MigrationError> {
        let store = manager.store();
        let lookup = manager.lookup();

        let mut claimed = 0;
        let mut removed = 0;

        for user in store.keys(Namespace::Users).await? {
            for key in store.members(Namespace::Users, &user).await? {
                let account_id = match lookup.lookup(&key).await {
                    LookupOutcome::Account(account_id) => account_id,
                    LookupOutcome::InvalidKey => {
                        tracing::info!("Removing invalid key of user {}", user);
                        store.remove_member(Namespace::Users, &user, &key).await?;
                        removed += 1;
                        continue;
                    }
                    LookupOutcome::Unavailable => {
                        tracing::warn!(
                            "Account API unavailable for a key of user {}, leaving it unindexed",
                            user
                        );
                        continue;
                    }
                };

                match store.get(Namespace::Unique, &account_id).await? {
                    None => {
                        store.set(Namespace::Unique, &account_id, &user).await?;
                        claimed += 1;
                    }
                    Some(owner) if owner == user => {}
                    Some(owner) => {
                        tracing::info!(
                            "User {} shares account {} with {}, removing the key",
                            user,
                            account_id,
                            owner
                        );
                        store.remove_member(Namespace::Users, &user, &key).await?;
                        removed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Indexed {} account(s), removed {} key(s)",
            claimed,
            removed
        );

        Ok(())
    }
}
