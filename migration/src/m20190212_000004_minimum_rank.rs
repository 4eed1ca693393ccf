use entity::prelude::{GroupPolicy, Namespace, LEGACY_GUILDS_KEY};

use crate::{async_trait, MigrationError, MigrationTrait, SchemaManager};

/// Rewrites every policy document with `minimumRank` set to 0.
pub struct Migration;

#[async_trait]
impl MigrationTrait for Migration {
    fn name(&self) -> &'static str {
        "minimum_rank"
    }

    fn from_version(&self) -> i64 {
        4
    }

    async fn up(&self, manager: &SchemaManager<'_>) -> Result<(), MigrationError> {
        let store = manager.store();

        for group in store.keys(Namespace::Guilds).await? {
            if group == LEGACY_GUILDS_KEY {
                continue;
            }

            let Some(document) = store.get(Namespace::Guilds, &group).await? else {
                continue;
            };

            let mut policy =
                GroupPolicy::from_json(&document).map_err(|source| MigrationError::Document {
                    key: group.clone(),
                    source,
                })?;
            policy.minimum_rank = 0;

            let document = policy.to_json().map_err(|source| MigrationError::Document {
                key: group.clone(),
                source,
            })?;
            store.set(Namespace::Guilds, &group, &document).await?;
        }

        Ok(())
    }
}
