//! Realm link topology.
//!
//! The topology is rebuilt from the realm catalog and the current match overviews. A rebuild
//! is all-or-nothing: if any catalog realm ends up without link information the partial map
//! is discarded and the rebuild is retried later, readers keep the previous snapshot.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::server::{
    error::{account::AccountError, Error},
    model::{
        account::{MatchOverview, World},
        topology::{LinkInfo, Topology},
    },
    service::account::AccountClient,
};

/// Realm ids at or above this value are reserved and never part of the topology.
pub const RESERVED_REALM_THRESHOLD: i64 = 10_000;

#[derive(Debug, Clone)]
pub struct TopologyConfig {
    /// Wait between two rebuild attempts.
    pub retry_delay: Duration,
    pub max_attempts: u32,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}

/// Something that can refresh the realm topology, the scheduler's view of it.
#[async_trait]
pub trait TopologyRefresher: Send + Sync {
    async fn refresh(&self) -> Result<(), Error>;
}

struct WorldTopologyRef {
    client: AccountClient,
    config: TopologyConfig,
    current: RwLock<Arc<Topology>>,
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct WorldTopology {
    inner: Arc<WorldTopologyRef>,
}

impl WorldTopology {
    pub fn new(client: AccountClient, config: TopologyConfig) -> Self {
        Self {
            inner: Arc::new(WorldTopologyRef {
                client,
                config,
                current: RwLock::new(Arc::new(Topology::default())),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Latest committed snapshot, empty until the first successful refresh.
    pub async fn snapshot(&self) -> Arc<Topology> {
        self.inner.current.read().await.clone()
    }

    /// Rebuilds the topology, retrying inconsistent or failed builds.
    ///
    /// # Returns
    /// - `Ok(Arc<Topology>)` - The newly committed snapshot
    /// - `Err(Error::TopologyUnavailable)` - Every attempt failed, the previous snapshot stays
    pub async fn rebuild(&self) -> Result<Arc<Topology>, Error> {
        let max_attempts = self.inner.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.try_build().await {
                Ok(Ok(links)) => return Ok(self.commit(links).await),
                Ok(Err(missing)) => warn!(
                    "Realm topology attempt {}/{} is incomplete, {} realms lack link information: {:?}",
                    attempt,
                    max_attempts,
                    missing.len(),
                    missing
                ),
                Err(e) => warn!(
                    "Realm topology attempt {}/{} failed: {}",
                    attempt, max_attempts, e
                ),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.inner.config.retry_delay).await;
            }
        }

        error!(
            "Giving up on realm topology after {} attempts, keeping the previous snapshot",
            max_attempts
        );

        Err(Error::TopologyUnavailable(max_attempts))
    }

    async fn try_build(&self) -> Result<Result<BTreeMap<i64, LinkInfo>, Vec<i64>>, AccountError> {
        let worlds = self.inner.client.fetch_worlds().await?;
        let matches = self.inner.client.fetch_current_matches().await?;

        Ok(build_links(&worlds, &matches))
    }

    async fn commit(&self, links: BTreeMap<i64, LinkInfo>) -> Arc<Topology> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let topology = Arc::new(Topology::new(generation, links));

        *self.inner.current.write().await = topology.clone();

        info!(
            "Committed realm topology generation {} with {} realms",
            generation,
            topology.links.len()
        );

        topology
    }
}

#[async_trait]
impl TopologyRefresher for WorldTopology {
    async fn refresh(&self) -> Result<(), Error> {
        self.rebuild().await.map(|_| ())
    }
}

/// Derives link information for every catalog realm.
///
/// Each realm's linked set is the union of the `all_worlds` rosters of every side it appears
/// on, itself included. Reserved realm ids are left out of the rosters.
///
/// # Returns
/// - `Ok(links)` - Every non-reserved catalog realm has link information
/// - `Err(missing)` - Realm ids of the catalog that no match mentions
pub fn build_links(
    worlds: &[World],
    matches: &[MatchOverview],
) -> Result<BTreeMap<i64, LinkInfo>, Vec<i64>> {
    let mut linked: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();

    for overview in matches {
        for side in overview.all_worlds.sides() {
            let roster: BTreeSet<i64> = side
                .iter()
                .copied()
                .filter(|realm_id| *realm_id < RESERVED_REALM_THRESHOLD)
                .collect();

            for realm_id in &roster {
                linked
                    .entry(*realm_id)
                    .or_default()
                    .extend(roster.iter().copied());
            }
        }
    }

    let mut links = BTreeMap::new();
    let mut missing = Vec::new();

    for world in worlds {
        if world.id >= RESERVED_REALM_THRESHOLD {
            continue;
        }

        match linked.get(&world.id) {
            Some(roster) => {
                links.insert(
                    world.id,
                    LinkInfo {
                        realm_id: world.id,
                        name: world.name.clone(),
                        linked_realm_ids: roster.clone(),
                    },
                );
            }
            None => missing.push(world.id),
        }
    }

    if missing.is_empty() {
        Ok(links)
    } else {
        Err(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::model::account::MatchSides;

    fn world(id: i64, name: &str) -> World {
        World {
            id,
            name: name.to_string(),
        }
    }

    fn overview(id: &str, red: &[i64], blue: &[i64], green: &[i64]) -> MatchOverview {
        MatchOverview {
            id: id.to_string(),
            all_worlds: MatchSides {
                red: red.to_vec(),
                blue: blue.to_vec(),
                green: green.to_vec(),
            },
        }
    }

    #[test]
    fn links_share_the_match_side() {
        let worlds = vec![
            world(1001, "Anvil Rock"),
            world(1002, "Borlis Pass"),
            world(1003, "Yak's Bend"),
            world(1004, "Henge of Denravi"),
        ];
        let matches = vec![overview("1-1", &[1001, 1004], &[1002], &[1003])];

        let links = build_links(&worlds, &matches).unwrap();

        assert_eq!(
            links[&1004].linked_realm_ids,
            BTreeSet::from([1001, 1004])
        );
        assert_eq!(
            links[&1001].linked_realm_ids,
            BTreeSet::from([1001, 1004])
        );
        assert_eq!(links[&1002].linked_realm_ids, BTreeSet::from([1002]));
        assert_eq!(links[&1003].name, "Yak's Bend");
    }

    #[test]
    fn missing_realm_discards_map() {
        let worlds = vec![world(1001, "Anvil Rock"), world(1002, "Borlis Pass")];
        let matches = vec![overview("1-1", &[1001], &[], &[])];

        assert_eq!(build_links(&worlds, &matches), Err(vec![1002]));
    }

    #[test]
    fn reserved_realms_are_skipped() {
        let worlds = vec![world(1001, "Anvil Rock"), world(11001, "Moogooloo")];
        let matches = vec![overview("1-1", &[1001], &[], &[])];

        let links = build_links(&worlds, &matches).unwrap();

        assert_eq!(links.len(), 1);
        assert!(!links.contains_key(&11001));
    }

    #[test]
    fn reserved_realms_are_left_out_of_rosters() {
        let worlds = vec![world(1001, "Anvil Rock"), world(1002, "Borlis Pass")];
        let matches = vec![overview("1-1", &[1001, 1002, 11001], &[12002], &[])];

        let links = build_links(&worlds, &matches).unwrap();

        assert_eq!(
            links[&1001].linked_realm_ids,
            BTreeSet::from([1001, 1002])
        );
        assert_eq!(
            links[&1002].linked_realm_ids,
            BTreeSet::from([1001, 1002])
        );
    }
}
