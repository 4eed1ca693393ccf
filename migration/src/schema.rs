//! Store access used by migration steps.

use async_trait::async_trait;
use entity::prelude::Namespace;

use crate::MigrationError;

/// Raw key-value primitives the migration steps are written against.
///
/// Values are either plain strings or sets of strings, mirroring the persisted layout.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, MigrationError>;
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<String>, MigrationError>;
    async fn set(&self, namespace: Namespace, key: &str, value: &str)
        -> Result<(), MigrationError>;
    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), MigrationError>;
    /// All keys in a namespace, without the namespace prefix.
    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, MigrationError>;
    async fn members(&self, namespace: Namespace, key: &str)
        -> Result<Vec<String>, MigrationError>;
    async fn add_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<(), MigrationError>;
    async fn remove_member(
        &self,
        namespace: Namespace,
        key: &str,
        member: &str,
    ) -> Result<(), MigrationError>;
    /// Moves a key of any type between namespaces, replacing the target.
    async fn move_key(
        &self,
        from: Namespace,
        to: Namespace,
        key: &str,
    ) -> Result<(), MigrationError>;
}

/// Result of resolving an API key to its account during a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The key is valid and belongs to the account with this id.
    Account(String),
    /// The account API rejected the key.
    InvalidKey,
    /// The account API could not answer; the key must be left alone.
    Unavailable,
}

#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn lookup(&self, key: &str) -> LookupOutcome;
}

/// Handle passed to every migration step.
pub struct SchemaManager<'a> {
    store: &'a dyn SchemaStore,
    lookup: &'a dyn AccountLookup,
}

impl<'a> SchemaManager<'a> {
    pub fn new(store: &'a dyn SchemaStore, lookup: &'a dyn AccountLookup) -> Self {
        Self { store, lookup }
    }

    pub fn store(&self) -> &dyn SchemaStore {
        self.store
    }

    pub fn lookup(&self) -> &dyn AccountLookup {
        self.lookup
    }
}
