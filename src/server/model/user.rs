use std::collections::BTreeSet;

/// Membership of one linked account in a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RealmMembership {
    pub realm_id: i64,
    pub rank: i64,
}

/// Everything known about a user's linked accounts after a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAccountData {
    /// Account names joined with `" | "`, empty when no key resolved.
    pub display_name: String,
    pub realms: BTreeSet<RealmMembership>,
}

impl UserAccountData {
    /// Realms at least one account belongs to with a rank of `minimum_rank` or more.
    pub fn qualifying_realms(&self, minimum_rank: i64) -> BTreeSet<i64> {
        self.realms
            .iter()
            .filter(|membership| membership.rank >= minimum_rank)
            .map(|membership| membership.realm_id)
            .collect()
    }
}

/// Result of refreshing every key of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAccounts {
    pub data: UserAccountData,
    /// False when any key failed transiently; role removals are then unsafe.
    pub may_remove: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifying_realms_respect_minimum_rank() {
        let data = UserAccountData {
            display_name: "A.1 | B.2".to_string(),
            realms: BTreeSet::from([
                RealmMembership {
                    realm_id: 1001,
                    rank: 10,
                },
                RealmMembership {
                    realm_id: 1005,
                    rank: 200,
                },
            ]),
        };

        assert_eq!(data.qualifying_realms(0), BTreeSet::from([1001, 1005]));
        assert_eq!(data.qualifying_realms(150), BTreeSet::from([1005]));
        assert!(data.qualifying_realms(500).is_empty());
    }
}
