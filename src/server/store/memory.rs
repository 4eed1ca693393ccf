use std::{
    collections::{BTreeMap, BTreeSet},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use entity::prelude::Namespace;
use tokio::sync::RwLock;

use crate::server::{error::store::StoreError, store::KeyValueStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Text(String),
    Set(BTreeSet<String>),
}

/// In-process store with the same semantics as [`super::RedisStore`].
///
/// Used by tests and for running the engine without Redis. [`MemoryStore::set_unavailable`]
/// makes every call fail like a dropped connection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<(Namespace, String), Value>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }

        Ok(())
    }
}

fn entry_key(namespace: Namespace, key: &str) -> (Namespace, String) {
    (namespace, key.to_string())
}

fn wrong_type(namespace: Namespace, key: &str) -> StoreError {
    StoreError::WrongType {
        namespace,
        key: key.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, StoreError> {
        self.check()?;

        Ok(self
            .entries
            .read()
            .await
            .contains_key(&entry_key(namespace, key)))
    }

    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;

        match self.entries.read().await.get(&entry_key(namespace, key)) {
            None => Ok(None),
            Some(Value::Text(value)) => Ok(Some(value.clone())),
            Some(Value::Set(_)) => Err(wrong_type(namespace, key)),
        }
    }

    async fn set(&self, namespace: Namespace, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;

        self.entries
            .write()
            .await
            .insert(entry_key(namespace, key), Value::Text(value.to_string()));

        Ok(())
    }

    async fn set_if_absent(
        &self,
        namespace: Namespace,
        key: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        self.check()?;

        let mut entries = self.entries.write().await;
        let entry_key = entry_key(namespace, key);
        if entries.contains_key(&entry_key) {
            return Ok(false);
        }
        entries.insert(entry_key, Value::Text(value.to_string()));

        Ok(true)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), StoreError> {
        self.check()?;

        self.entries.write().await.remove(&entry_key(namespace, key));

        Ok(())
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StoreError> {
        self.check()?;

        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn members(&self, namespace: Namespace, key: &str) -> Result<Vec<String>, StoreError> {
        self.check()?;

        match self.entries.read().await.get(&entry_key(namespace, key)) {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(Value::Text(_)) => Err(wrong_type(namespace, key)),
        }
    }

    async fn add_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError> {
        self.check()?;

        let mut entries = self.entries.write().await;
        match entries
            .entry(entry_key(namespace, key))
            .or_insert_with(|| Value::Set(BTreeSet::new()))
        {
            Value::Set(members) => Ok(members.insert(member.to_string())),
            Value::Text(_) => Err(wrong_type(namespace, key)),
        }
    }

    async fn remove_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError> {
        self.check()?;

        let mut entries = self.entries.write().await;
        let entry_key = entry_key(namespace, key);
        let (removed, now_empty) = match entries.get_mut(&entry_key) {
            None => return Ok(false),
            Some(Value::Set(members)) => (members.remove(member), members.is_empty()),
            Some(Value::Text(_)) => return Err(wrong_type(namespace, key)),
        };
        // Redis drops empty sets
        if now_empty {
            entries.remove(&entry_key);
        }

        Ok(removed)
    }

    async fn move_key(
        &self,
        from: Namespace,
        to: Namespace,
        key: &str,
    ) -> Result<(), StoreError> {
        self.check()?;

        let mut entries = self.entries.write().await;
        let value = entries
            .remove(&entry_key(from, key))
            .ok_or_else(|| StoreError::MissingKey {
                namespace: from,
                key: key.to_string(),
            })?;
        entries.insert(entry_key(to, key), value);

        Ok(())
    }
}
