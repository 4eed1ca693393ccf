use entity::prelude::{Namespace, LEGACY_GUILDS_KEY, VERSION_KEY};

use crate::{async_trait, MigrationError, MigrationTrait, SchemaManager};

/// Moves user key sets and the global guild set out of the version namespace.
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "split_namespaces"
    }

    fn from_version(&self) -> i64 {
        1
    }

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<(), MigrationError> {
        let store = manager.store();

        if store.exists(Namespace::Version, LEGACY_GUILDS_KEY).await? {
            store
                .move_key(Namespace::Version, Namespace::Guilds, LEGACY_GUILDS_KEY)
                .await?;
        }

        // Every other key in the old flat layout is a user id holding a set of API keys
        let mut moved = 0;
        for key in store.keys(Namespace::Version).await? {
            if key == VERSION_KEY || key == LEGACY_GUILDS_KEY {
                continue;
            }

            store
                .move_key(Namespace::Version, Namespace::Users, &key)
                .await?;
            moved += 1;
        }

        tracing::info!("Moved {} user key set(s) to the users namespace", moved);

        Ok(())
    }
}
