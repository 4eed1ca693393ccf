use async_trait::async_trait;
use entity::prelude::Namespace;
use fred::{
    cmd,
    interfaces::{KeysInterface, SetsInterface},
    prelude::*,
};

use crate::server::{error::store::StoreError, store::KeyValueStore};

/// Store backed by a Redis-compatible server.
///
/// Every key is written as `{prefix}:{namespace}:{key}`, one prefix per deployment.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    prefix: String,
}

impl RedisStore {
    pub const DEFAULT_PREFIX: &'static str = "wvwlink";

    pub fn new(pool: Pool) -> Self {
        Self::with_prefix(pool, Self::DEFAULT_PREFIX)
    }

    /// Uses a custom key prefix, handy to isolate parallel test runs.
    pub fn with_prefix(pool: Pool, prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
        }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    fn key(&self, namespace: Namespace, key: &str) -> String {
        format!("{}:{}:{}", self.prefix, namespace, key)
    }

    fn namespace_prefix(&self, namespace: Namespace) -> String {
        format!("{}:{}:", self.prefix, namespace)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError> {
        let count: i64 = self.pool.exists(self.key(namespace, key)).await?;

        Ok(count > 0)
    }

    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.pool.get(self.key(namespace, key)).await?)
    }

    async fn set(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError> {
        self.pool
            .set::<(), _, _>(self.key(namespace, key), value, None, None, false)
            .await?;

        Ok(())
    }

    async fn set_if_absent(
        &self,
        namespace: Namespace,
        key: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.pool.setnx(self.key(namespace, key), value).await?)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), StoreError> {
        self.pool.del::<i64, _>(self.key(namespace, key)).await?;

        Ok(())
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        let prefix = self.namespace_prefix(namespace);
        let pattern = format!("{}*", prefix);
        let keys: Vec<String> = self.pool.custom(cmd!("KEYS"), vec![pattern]).await?;

        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn members(&self, namespace: Namespace, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.pool.smembers(self.key(namespace, key)).await?)
    }

    async fn add_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError> {
        let added: i64 = self.pool.sadd(self.key(namespace, key), member).await?;

        Ok(added > 0)
    }

    async fn remove_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError> {
        let removed: i64 = self.pool.srem(self.key(namespace, key), member).await?;

        Ok(removed > 0)
    }

    async fn move_key(
        &self,
        from: Namespace,
        to: Namespace,
        key: &str,
    ) -> Result<(), StoreError> {
        // RENAME fails on a missing source with a generic error, report it precisely instead
        if !KeyValueStore::exists(self, from, key).await? {
            return Err(StoreError::MissingKey {
                namespace: from,
                key: key.to_string(),
            });
        }

        self.pool
            .rename::<(), _, _>(self.key(from, key), self.key(to, key))
            .await?;

        Ok(())
    }
}
