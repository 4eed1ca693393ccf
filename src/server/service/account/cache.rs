//! Per-credential account cache.

use std::{collections::HashMap, time::Duration};

use tokio::{sync::RwLock, time::Instant};

use crate::server::model::account::Account;

#[derive(Debug, Clone)]
struct CacheEntry {
    account: Account,
    stored_at: Instant,
}

/// Successful account responses keyed by API key.
///
/// Only successes are stored, so a failed refresh never hides a newer answer. The lifetime is
/// decided by the reader, the sweep cadence can change between writes.
#[derive(Debug, Default)]
pub struct AccountCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl AccountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached account if it is younger than `ttl`.
    pub async fn get(&self, key: &str, ttl: Duration) -> Option<Account> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .map(|entry| entry.account.clone())
    }

    pub async fn insert(&self, key: &str, account: Account) {
        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                account,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Drops entries older than `ttl`, run after every sweep.
    pub async fn purge_older_than(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: "A-1".to_string(),
            name: "Tester.1234".to_string(),
            world: 1001,
            wvw_rank: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_by_reader_ttl() {
        let cache = AccountCache::new();
        cache.insert("KEY", account()).await;

        tokio::time::advance(Duration::from_secs(600)).await;

        assert_eq!(
            cache.get("KEY", Duration::from_secs(900)).await,
            Some(account())
        );
        assert_eq!(cache.get("KEY", Duration::from_secs(300)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_stale_entries() {
        let cache = AccountCache::new();
        cache.insert("OLD", account()).await;
        tokio::time::advance(Duration::from_secs(120)).await;
        cache.insert("NEW", account()).await;

        assert_eq!(cache.purge_older_than(Duration::from_secs(60)).await, 1);
        assert_eq!(cache.len().await, 1);
    }
}
