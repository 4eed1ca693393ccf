use std::collections::{BTreeMap, BTreeSet};

/// Link information of a single realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub realm_id: i64,
    pub name: String,
    /// Full roster of the realm's match side, including the realm itself.
    pub linked_realm_ids: BTreeSet<i64>,
}

/// Immutable realm topology snapshot.
///
/// A snapshot is only ever built complete: every realm of the catalog carries a link entry.
/// Readers hold an `Arc<Topology>` and never observe a half-built map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    /// Bumped on every commit, 0 for the empty snapshot used before the first refresh.
    pub generation: u64,
    pub links: BTreeMap<i64, LinkInfo>,
}

impl Topology {
    pub fn new(generation: u64, links: BTreeMap<i64, LinkInfo>) -> Self {
        Self { generation, links }
    }

    /// No topology has been committed yet.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn name_of(&self, realm_id: i64) -> Option<&str> {
        self.links.get(&realm_id).map(|link| link.name.as_str())
    }

    /// Realms sharing a match side with `realm_id`, the realm itself included.
    pub fn linked_to(&self, realm_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.links
            .get(&realm_id)
            .into_iter()
            .flat_map(|link| link.linked_realm_ids.iter().copied())
    }

    pub fn realm_names(&self) -> impl Iterator<Item = &str> {
        self.links.values().map(|link| link.name.as_str())
    }
}
