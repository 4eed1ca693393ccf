//! Resolves a user's keys into the realms they belong to.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::server::{
    error::{account::AccountError, retry::ErrorRetryStrategy, Error},
    model::{
        account::Account,
        user::{RealmMembership, ResolvedAccounts, UserAccountData},
    },
    scheduler::SweepTiming,
    service::{account::AccountClient, retry::RetryContext},
    store::{AccountIndex, ClaimOutcome, UserStore},
};

/// Separator between account names in the display name.
pub const DISPLAY_NAME_SEPARATOR: &str = " | ";

pub struct AccountResolver {
    client: AccountClient,
    users: Arc<dyn UserStore>,
    index: Arc<dyn AccountIndex>,
    timing: SweepTiming,
    retry: RetryContext,
}

impl AccountResolver {
    /// Creates a new instance of [`AccountResolver`].
    ///
    /// # Arguments
    /// - `client` - Account API client, its cache serves non-forced lookups
    /// - `users` - Keys per user; revoked keys are removed here
    /// - `index` - Account uniqueness index
    /// - `timing` - Provides the current cache lifetime
    pub fn new(
        client: AccountClient,
        users: Arc<dyn UserStore>,
        index: Arc<dyn AccountIndex>,
        timing: SweepTiming,
    ) -> Self {
        Self {
            client,
            users,
            index,
            timing,
            retry: RetryContext::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryContext) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches every key of `user_id` and aggregates the accounts behind them.
    ///
    /// Keys the account API rejects, even after confirmation, are revoked. Keys whose account
    /// belongs to another user are revoked as well. A key that fails for any other reason
    /// contributes nothing and marks the result as unsafe for role removals.
    ///
    /// # Arguments
    /// - `user_id` - User to resolve
    /// - `force` - Bypass the cache and retry transient failures
    ///
    /// # Returns
    /// - `Ok(ResolvedAccounts)` - Aggregated accounts of every usable key
    /// - `Err(Error)` - The user or index store failed
    pub async fn resolve(&self, user_id: &str, force: bool) -> Result<ResolvedAccounts, Error> {
        let keys = self.users.get_keys_for_user(user_id).await?;

        let mut names = Vec::with_capacity(keys.len());
        let mut data = UserAccountData::default();
        let mut may_remove = true;

        for key in &keys {
            let account = match self.fetch(key, force).await {
                Ok(account) => account,
                Err(e) if e.is_credential() => {
                    info!("Revoking rejected API key of user {}: {}", user_id, e);
                    self.revoke(user_id, key).await?;
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Account lookup for user {} failed, keeping their roles: {}",
                        user_id, e
                    );
                    may_remove = false;
                    continue;
                }
            };

            if let ClaimOutcome::TakenBy(holder) =
                self.index.claim(&account.id, user_id, false).await?
            {
                info!(
                    "Revoking API key of user {}: account {} is linked to user {}",
                    user_id, account.name, holder
                );
                self.revoke(user_id, key).await?;
                continue;
            }

            data.realms.insert(RealmMembership {
                realm_id: account.world,
                rank: account.wvw_rank,
            });
            names.push(account.name);
        }

        data.display_name = names.join(DISPLAY_NAME_SEPARATOR);

        debug!(
            "Resolved {} of {} key(s) of user {} into {} realm membership(s)",
            names.len(),
            keys.len(),
            user_id,
            data.realms.len()
        );

        Ok(ResolvedAccounts { data, may_remove })
    }

    async fn fetch(&self, key: &str, force: bool) -> Result<Account, AccountError> {
        let client = &self.client;
        let ttl = self.timing.cache_ttl();

        self.retry
            .execute_with_strategy(
                "account lookup",
                |e: &AccountError| {
                    // A rejection is confirmed before the key is revoked. Sweeps don't wait on
                    // a flaky upstream, the next sweep picks the user up again.
                    if e.is_credential() || force {
                        ErrorRetryStrategy::Retry
                    } else {
                        ErrorRetryStrategy::Fail
                    }
                },
                || async move {
                    if force {
                        client.fetch_account(key).await
                    } else {
                        client.fetch_account_cached(key, ttl).await
                    }
                },
            )
            .await
    }

    async fn revoke(&self, user_id: &str, key: &str) -> Result<(), Error> {
        self.users.remove_key(user_id, key).await?;
        self.client.cache().invalidate(key).await;

        Ok(())
    }
}
