
use std::{collections::BTreeMap, sync::Arc};

use crate::server::{
    model::{
        topology::{LinkInfo, Topology},
        user::{RealmMembership, ResolvedAccounts, UserAccountData},
    },
    platform::memory::MemoryPlatform,
    service::reconcile::Reconciler,
    store::MemoryStore,
};

const GROUP: &str = "g1";

struct Fixture {
    platform: Arc<MemoryPlatform>,
    store: Arc<MemoryStore>,
    reconciler: Reconciler,
}

async fn fixture(members: &[&str]) -> Fixture {
    let platform = Arc::new(MemoryPlatform::new());
    let store = Arc::new(MemoryStore::new());

    platform.add_group(GROUP).await;
    for member in members {
        platform.add_member(GROUP, member).await;
    }

    let reconciler = Reconciler::new(platform.clone(), store.clone());

    Fixture {
        platform,
        store,
        reconciler,
    }
}

fn link(realm_id: i64, name: &str, side: &[i64]) -> (i64, LinkInfo) {
    (
        realm_id,
        LinkInfo {
            realm_id,
            name: name.to_string(),
            linked_realm_ids: side.iter().copied().collect(),
        },
    )
}

/// Anvil Rock (1001) is linked with Borlis Pass (1002), Maguuma (1005) fights alone.
fn topology() -> Topology {
    Topology::new(
        1,
        BTreeMap::from([
            link(1001, "Anvil Rock", &[1001, 1002]),
            link(1002, "Borlis Pass", &[1001, 1002]),
            link(1005, "Maguuma", &[1005]),
        ]),
    )
}

fn resolved(realms: &[(i64, i64)], may_remove: bool) -> ResolvedAccounts {
    ResolvedAccounts {
        data: UserAccountData {
            display_name: if realms.is_empty() {
                String::new()
            } else {
                "Tester.1234".to_string()
            },
            realms: realms
                .iter()
                .map(|(realm_id, rank)| RealmMembership {
                    realm_id: *realm_id,
                    rank: *rank,
                })
                .collect(),
        },
        may_remove,
    }
}
