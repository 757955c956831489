//! Breadth-first discovery of a member's downline.
//!
//! Level 1 is every member referred by the root; level `k` is every member
//! referred by someone at level `k - 1`. Each level costs exactly one
//! batched lookup against the whole frontier, so a wide tree never fans out
//! into per-member queries.
//!
//! A member is placed at the level where it is first discovered. Members
//! already seen (including the root) are never re-enqueued, so a malformed
//! referrer graph containing a cycle terminates instead of looping.

use affiliate_core::{MemberId, ReferralGraph};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Members discovered per level, with the referrer that led to each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeLevels {
    levels: BTreeMap<usize, BTreeSet<MemberId>>,
    referrer_of: HashMap<MemberId, MemberId>,
}

impl TreeLevels {
    /// Members at a 1-based level; empty when the level was not reached.
    pub fn level(&self, level: usize) -> impl Iterator<Item = MemberId> + '_ {
        self.levels.get(&level).into_iter().flatten().copied()
    }

    #[must_use]
    pub fn level_len(&self, level: usize) -> usize {
        self.levels.get(&level).map_or(0, BTreeSet::len)
    }

    /// Non-empty levels in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<MemberId>)> {
        self.levels.iter().map(|(level, members)| (*level, members))
    }

    /// Deepest level reached; zero when the root has no descendants.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.keys().next_back().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of discovered members, excluding the root.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.levels.values().map(BTreeSet::len).sum()
    }

    /// Every discovered member across all levels, excluding the root.
    pub fn members(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.levels.values().flatten().copied()
    }

    /// Referrer through which `member` was discovered.
    #[must_use]
    pub fn referrer_of(&self, member: MemberId) -> Option<MemberId> {
        self.referrer_of.get(&member).copied()
    }
}

pub struct TreeGatherer {
    graph: Arc<dyn ReferralGraph>,
}

impl TreeGatherer {
    #[must_use]
    pub fn new(graph: Arc<dyn ReferralGraph>) -> Self {
        Self { graph }
    }

    /// Discovers levels `1..=max_depth` below `root`.
    ///
    /// Stops early once a level comes back empty. The caller clamps
    /// `max_depth` to the configured ceiling.
    ///
    /// # Errors
    /// Returns an error if a referral lookup fails.
    pub async fn gather_levels(&self, root: MemberId, max_depth: usize) -> Result<TreeLevels> {
        let mut tree = TreeLevels::default();
        let mut seen: HashSet<MemberId> = HashSet::from([root]);
        let mut frontier: Vec<MemberId> = vec![root];

        for level in 1..=max_depth {
            if frontier.is_empty() {
                break;
            }

            let referrals = self.graph.referrals_of(&frontier).await?;

            let mut discovered = BTreeSet::new();
            for referral in referrals {
                if seen.insert(referral.member_id) {
                    discovered.insert(referral.member_id);
                    tree.referrer_of
                        .insert(referral.member_id, referral.referrer_id);
                } else {
                    warn!(
                        member = root,
                        revisited = referral.member_id,
                        level,
                        "Member reached twice during traversal, referrer graph has a cycle"
                    );
                }
            }

            debug!(member = root, level, members = discovered.len(), "Discovered referral level");

            if discovered.is_empty() {
                break;
            }
            frontier = discovered.iter().copied().collect();
            tree.levels.insert(level, discovered);
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn chain_store() -> Arc<InMemoryStore> {
        // 1 -> {2, 3}, 2 -> {4}, 4 -> {5}
        let store = Arc::new(InMemoryStore::new());
        store.add_member(1, "root", None);
        store.add_member(2, "a", Some(1));
        store.add_member(3, "b", Some(1));
        store.add_member(4, "c", Some(2));
        store.add_member(5, "d", Some(4));
        store
    }

    #[tokio::test]
    async fn gathers_levels_by_bfs_distance() {
        let store = chain_store();
        let gatherer = TreeGatherer::new(store.clone());

        let tree = gatherer.gather_levels(1, 9).await.unwrap();

        assert_eq!(tree.level(1).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(tree.level(2).collect::<Vec<_>>(), vec![4]);
        assert_eq!(tree.level(3).collect::<Vec<_>>(), vec![5]);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.member_count(), 4);
        assert_eq!(tree.referrer_of(4), Some(2));
    }

    #[tokio::test]
    async fn issues_one_lookup_per_level_and_stops_when_empty() {
        let store = chain_store();
        let gatherer = TreeGatherer::new(store.clone());

        gatherer.gather_levels(1, 9).await.unwrap();

        // three populated levels plus the empty fourth that ends the walk
        assert_eq!(store.query_counts().referrals, 4);
    }

    #[tokio::test]
    async fn respects_max_depth() {
        let store = chain_store();
        let gatherer = TreeGatherer::new(store.clone());

        let tree = gatherer.gather_levels(1, 2).await.unwrap();

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.level_len(3), 0);
        assert_eq!(store.query_counts().referrals, 2);
    }

    #[tokio::test]
    async fn leaf_root_yields_empty_tree() {
        let store = chain_store();
        let gatherer = TreeGatherer::new(store.clone());

        let tree = gatherer.gather_levels(5, 9).await.unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.level(1).count(), 0);
    }

    #[tokio::test]
    async fn zero_depth_issues_no_lookup() {
        let store = chain_store();
        let gatherer = TreeGatherer::new(store.clone());

        let tree = gatherer.gather_levels(1, 0).await.unwrap();

        assert!(tree.is_empty());
        assert_eq!(store.query_counts().referrals, 0);
    }

    #[tokio::test]
    async fn cycle_terminates_without_double_counting() {
        // 1 -> 2 -> 3 -> 1
        let store = Arc::new(InMemoryStore::new());
        store.add_member(1, "a", Some(3));
        store.add_member(2, "b", Some(1));
        store.add_member(3, "c", Some(2));
        let gatherer = TreeGatherer::new(store.clone());

        let tree = gatherer.gather_levels(1, 9).await.unwrap();

        assert_eq!(tree.level(1).collect::<Vec<_>>(), vec![2]);
        assert_eq!(tree.level(2).collect::<Vec<_>>(), vec![3]);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.member_count(), 2);
    }
}
