use async_trait::async_trait;
use migration::{AccountLookup, LookupOutcome};
use tracing::warn;

use crate::server::{error::account::ErrorKind, service::account::AccountClient};

/// Lets schema migrations resolve stored keys through the rate limited client.
#[async_trait]
impl AccountLookup for AccountClient {
    async fn lookup(&self, key: &str) -> LookupOutcome {
        match self.fetch_account(key).await {
            Ok(account) => LookupOutcome::Account(account.id),
            Err(e) if e.kind() == ErrorKind::Credential => LookupOutcome::InvalidKey,
            Err(e) => {
                warn!("Account lookup during migration failed, keeping key: {}", e);
                LookupOutcome::Unavailable
            }
        }
    }
}
