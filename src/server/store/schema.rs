//! Lets the migration steps run against the engine's store backends.

use async_trait::async_trait;
use entity::prelude::Namespace;
use migration::{MigrationError, SchemaStore};

use crate::server::store::{KeyValueStore, MemoryStore, RedisStore};

macro_rules! impl_schema_store {
    ($store:ty) => {
        #[async_trait]
        impl SchemaStore for $store {
            async fn exists(
                &self,
                namespace: Namespace,
                key: &str,
            ) -> Result<bool, MigrationError> {
                KeyValueStore::exists(self, namespace, key)
                    .await
                    .map_err(MigrationError::store)
            }

            async fn get(
                &self,
                namespace: Namespace,
                key: &str,
            ) -> Result<Option<String>, MigrationError> {
                KeyValueStore::get(self, namespace, key)
                    .await
                    .map_err(MigrationError::store)
            }

            async fn set(
                &self,
                namespace: Namespace,
                key: &str,
                value: &str,
            ) -> Result<(), MigrationError> {
                KeyValueStore::set(self, namespace, key, value)
                    .await
                    .map_err(MigrationError::store)
            }

            async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), MigrationError> {
                KeyValueStore::delete(self, namespace, key)
                    .await
                    .map_err(MigrationError::store)
            }

            async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, MigrationError> {
                KeyValueStore::keys(self, namespace)
                    .await
                    .map_err(MigrationError::store)
            }

            async fn members(
                &self,
                namespace: Namespace,
                key: &str,
            ) -> Result<Vec<String>, MigrationError> {
                KeyValueStore::members(self, namespace, key)
                    .await
                    .map_err(MigrationError::store)
            }

            async fn add_member(
                &self,
                namespace: Namespace,
                key: &str,
                member: &str,
            ) -> Result<(), MigrationError> {
                KeyValueStore::add_member(self, namespace, key, member)
                    .await
                    .map(|_| ())
                    .map_err(MigrationError::store)
            }

            async fn remove_member(
                &self,
                namespace: Namespace,
                key: &str,
                member: &str,
            ) -> Result<(), MigrationError> {
                KeyValueStore::remove_member(self, namespace, key, member)
                    .await
                    .map(|_| ())
                    .map_err(MigrationError::store)
            }

            async fn move_key(
                &self,
                from: Namespace,
                to: Namespace,
                key: &str,
            ) -> Result<(), MigrationError> {
                KeyValueStore::move_key(self, from, to, key)
                    .await
                    .map_err(MigrationError::store)
            }
        }
    };
}

impl_schema_store!(MemoryStore);
impl_schema_store!(RedisStore);
