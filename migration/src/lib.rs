//! Versioned schema evolution for the wvwlink key-value store.
//!
//! The schema version is a single integer under [`VERSION_KEY`] in the version namespace.
//! [`Migrator::up`] reads it, runs every step whose `from_version` matches the current
//! version in order, and writes the new version only after a step has fully succeeded, so an
//! aborted run simply resumes at the failed step next time. Each step reads the old shape,
//! writes the new shape, then deletes the old shape and is safe to re-run.

pub mod error;
pub mod schema;

mod m20180601_000001_split_namespaces;
mod m20180715_000002_group_documents;
mod m20181104_000003_account_index;
mod m20190212_000004_minimum_rank;

use entity::prelude::{Namespace, CURRENT_SCHEMA_VERSION, LEGACY_GUILDS_KEY, VERSION_KEY};
use tracing::{error, info};

pub use async_trait::async_trait;
pub use error::MigrationError;
pub use schema::{AccountLookup, LookupOutcome, SchemaManager, SchemaStore};

/// One step of the schema state machine.
#[async_trait]
pub trait MigrationTrait: Send + Sync {
    /// Human readable name used in logs.
    fn name(&self) -> &'static str;

    /// Version this step upgrades from; it leaves the store at `from_version() + 1`.
    fn from_version(&self) -> i64;

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<(), MigrationError>;
}

pub struct Migrator;

impl Migrator {
    pub fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20180601_000001_split_namespaces::Migration),
            Box::new(m20180715_000002_group_documents::Migration),
            Box::new(m20181104_000003_account_index::Migration),
            Box::new(m20190212_000004_minimum_rank::Migration),
        ]
    }

    /// Determines the schema version of the store.
    ///
    /// # Returns
    /// - `Ok(Some(version))` - Version key present, or the legacy layout was detected, including
    ///   one left behind by an aborted first step
    /// - `Ok(None)` - Empty store, nothing to migrate
    /// - `Err(MigrationError)` - The store could not be inspected
    pub async fn detect_version(store: &dyn SchemaStore) -> Result<Option<i64>, MigrationError> {
        if let Some(raw) = store.get(Namespace::Version, VERSION_KEY).await? {
            let version = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| MigrationError::InvalidVersion(raw.clone()))?;
            return Ok(Some(version));
        }

        // Version 1 never wrote a version key. It is recognised by any key left in the version
        // namespace, or by a guild set that an aborted first step already moved out of it.
        if !store.keys(Namespace::Version).await?.is_empty()
            || store.exists(Namespace::Guilds, LEGACY_GUILDS_KEY).await?
        {
            return Ok(Some(1));
        }

        Ok(None)
    }

    /// Brings the store up to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Must run before anything else touches persisted state. Any error is fatal: callers
    /// should refuse to start rather than operate on an unknown schema.
    ///
    /// # Returns
    /// - `Ok(version)` - The version the store is at after migrating
    /// - `Err(MigrationError)` - Version check or a step failed, the store is left at the
    ///   last successfully completed version
    pub async fn up(
        store: &dyn SchemaStore,
        lookup: &dyn AccountLookup,
    ) -> Result<i64, MigrationError> {
        let detected = Self::detect_version(store).await.map_err(|e| {
            error!(
                "Failed to check schema version, refusing to start to protect the store: {}",
                e
            );
            MigrationError::VersionCheck(Box::new(e))
        })?;

        let mut version = match detected {
            Some(version) => version,
            None => {
                info!(
                    "Empty store, stamping schema version {}",
                    CURRENT_SCHEMA_VERSION
                );
                Self::write_version(store, CURRENT_SCHEMA_VERSION).await?;
                return Ok(CURRENT_SCHEMA_VERSION);
            }
        };

        if version > CURRENT_SCHEMA_VERSION {
            return Err(MigrationError::UnknownVersion(version));
        }

        // Stamp the legacy layout first, so an aborted first step is still recognised on the
        // next run once it has moved keys out of the version namespace.
        if version == 1 {
            Self::write_version(store, version).await?;
        }

        let manager = SchemaManager::new(store, lookup);

        for migration in Self::migrations() {
            if migration.from_version() != version {
                continue;
            }

            info!(
                "Migrating schema from version {} to {} ({})",
                version,
                version + 1,
                migration.name()
            );

            migration.up(&manager).await.map_err(|e| {
                error!(
                    "Migration {} failed at version {}: {}",
                    migration.name(),
                    version,
                    e
                );
                e
            })?;

            version += 1;
            Self::write_version(store, version).await?;
        }

        if version != CURRENT_SCHEMA_VERSION {
            return Err(MigrationError::UnknownVersion(version));
        }

        info!("Schema is at version {}", version);

        Ok(version)
    }

    async fn write_version(store: &dyn SchemaStore, version: i64) -> Result<(), MigrationError> {
        store
            .set(Namespace::Version, VERSION_KEY, &version.to_string())
            .await
    }
}
