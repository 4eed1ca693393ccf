use entity::prelude::{GroupPolicy, Namespace, LEGACY_GUILDS_KEY};

use crate::{async_trait, MigrationError, MigrationTrait, SchemaManager};

/// Replaces the global guild set with one default policy document per group.
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "group_documents"
    }

    fn from_version(&self) -> i64 {
        2
    }

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<(), MigrationError> {
        let store = manager.store();
        let groups = store.members(Namespace::Guilds, LEGACY_GUILDS_KEY).await?;

        let document = GroupPolicy::default()
            .to_json()
            .map_err(|source| MigrationError::Document {
                key: LEGACY_GUILDS_KEY.to_string(),
                source,
            })?;

        for group in &groups {
            // A re-run after a partial failure must not reset documents already written
            if store.exists(Namespace::Guilds, group).await? {
                continue;
            }

            store.set(Namespace::Guilds, group, &document).await?;
        }

        store.delete(Namespace::Guilds, LEGACY_GUILDS_KEY).await?;

        tracing::info!("Created policy documents for {} group(s)", groups.len());

        Ok(())
    }
}
