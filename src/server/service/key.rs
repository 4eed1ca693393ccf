//! API key registration.

use std::sync::Arc;

use tracing::info;

use crate::server::{
    error::{key::KeyError, Error},
    model::{account::Account, worker::WorkItem},
    service::{account::AccountClient, retry::RetryContext},
    store::{AccountIndex, ClaimOutcome, UserStore},
    worker::queue::WorkerQueue,
};

/// Permission a key needs for the rank to be reported.
pub const REQUIRED_PERMISSION: &str = "progression";

/// Fragments the key name must contain, case-insensitive.
const REQUIRED_NAME_PARTS: [&str; 2] = ["wvw", "bot"];

pub struct KeyService {
    client: AccountClient,
    users: Arc<dyn UserStore>,
    index: Arc<dyn AccountIndex>,
    queue: WorkerQueue,
    retry: RetryContext,
}

impl KeyService {
    pub fn new(
        client: AccountClient,
        users: Arc<dyn UserStore>,
        index: Arc<dyn AccountIndex>,
        queue: WorkerQueue,
    ) -> Self {
        Self {
            client,
            users,
            index,
            queue,
            retry: RetryContext::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryContext) -> Self {
        self.retry = retry;
        self
    }

    /// Registers `key` for `user_id` and queues a forced refresh of the user.
    ///
    /// The key name must contain both "wvw" and "bot" and the key must grant
    /// [`REQUIRED_PERMISSION`]. An account linked to another user can only be taken over when
    /// the key name contains the claiming user's id; the previous owner's key is then revoked
    /// on their next refresh.
    ///
    /// # Returns
    /// - `Ok(Account)` - The account behind the key
    /// - `Err(Error::KeyError)` - The key was refused
    /// - `Err(Error::AccountError)` - The account API failed or rejected the key
    pub async fn add_key(&self, user_id: &str, key: &str) -> Result<Account, Error> {
        let token = self
            .retry
            .execute_with_retry("token info lookup", || self.client.fetch_token_info(key))
            .await?;

        let name = token.name.to_lowercase();
        if !REQUIRED_NAME_PARTS.iter().all(|part| name.contains(part)) {
            return Err(KeyError::InvalidName { name: token.name }.into());
        }
        if !token.has_permission(REQUIRED_PERMISSION) {
            return Err(KeyError::MissingPermission(REQUIRED_PERMISSION.to_string()).into());
        }

        let account = self
            .retry
            .execute_with_retry("account lookup", || self.client.fetch_account(key))
            .await?;

        let force = name.contains(&user_id.to_lowercase());
        match self.index.claim(&account.id, user_id, force).await? {
            ClaimOutcome::TakenBy(holder) => {
                return Err(KeyError::AlreadyTaken {
                    account_name: account.name,
                    holder,
                }
                .into())
            }
            ClaimOutcome::Reassigned { previous } => {
                info!(
                    "Account {} moved from user {} to user {}",
                    account.name, previous, user_id
                );
                self.queue.push(WorkItem::forced(previous)).await?;
            }
            ClaimOutcome::Claimed | ClaimOutcome::AlreadyOwned => {}
        }

        self.users.add_key(user_id, key).await?;
        self.queue.push(WorkItem::forced(user_id)).await?;

        info!("Registered API key of account {} for user {}", account.name, user_id);

        Ok(account)
    }

    /// Deletes every key of `user_id` and releases their accounts.
    ///
    /// A refresh is queued so the user's roles are removed.
    pub async fn remove_user_data(&self, user_id: &str) -> Result<usize, Error> {
        self.users.remove_user(user_id).await?;
        let released = self.index.release_all_for(user_id).await?;
        self.queue.push(WorkItem::forced(user_id)).await?;

        info!(
            "Removed all keys of user {}, released {} account(s)",
            user_id, released
        );

        Ok(released)
    }
}
