//! Nested downline tree with per-member revenue.
//!
//! Built from one BFS that goes one level past the requested depth, so
//! nodes on the last displayed level still report how many members they
//! referred. Profiles come from one batched member lookup and revenue from
//! one aggregation call.

use affiliate_core::{MemberDirectory, MemberId, MemberRecord, ReportWindow};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::amounts::{AmountAggregator, AmountSummary};
use crate::tree::TreeGatherer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
    pub id: MemberId,
    pub username: String,
    /// Full name, or the username when none is on file.
    pub fullname: String,
    /// Rank tier of the member.
    pub level: i32,
    pub direct_referrals: usize,
    pub total_commissions: Decimal,
    pub monthly_commissions: Decimal,
    pub children: Vec<NetworkNode>,
}

impl NetworkNode {
    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }
}

pub struct NetworkTreeBuilder {
    gatherer: TreeGatherer,
    aggregator: AmountAggregator,
    members: Arc<dyn MemberDirectory>,
}

impl NetworkTreeBuilder {
    #[must_use]
    pub fn new(
        gatherer: TreeGatherer,
        aggregator: AmountAggregator,
        members: Arc<dyn MemberDirectory>,
    ) -> Self {
        Self {
            gatherer,
            aggregator,
            members,
        }
    }

    /// Builds the tree below `root` down to `depth` levels.
    ///
    /// Returns `None` when `root` has no member record.
    ///
    /// # Errors
    /// Returns an error if discovery, the member lookup, or aggregation fails.
    pub async fn build(
        &self,
        root: MemberId,
        depth: usize,
        window: &ReportWindow,
    ) -> Result<Option<NetworkNode>> {
        let tree = self.gatherer.gather_levels(root, depth + 1).await?;

        let mut direct_counts: HashMap<MemberId, usize> = HashMap::new();
        for member in tree.members() {
            if let Some(referrer) = tree.referrer_of(member) {
                *direct_counts.entry(referrer).or_default() += 1;
            }
        }

        let mut shown: Vec<MemberId> = (1..=depth).flat_map(|level| tree.level(level)).collect();
        shown.push(root);

        let records = self.members.find_members(&shown).await?;
        let Some(root_record) = records.iter().find(|record| record.id == root).cloned() else {
            debug!(member = root, "Network root has no member record");
            return Ok(None);
        };

        let amounts = self.aggregator.batch_load(&shown, window).await?;

        // records arrive ordered by join time then id
        let mut children_of: HashMap<MemberId, Vec<&MemberRecord>> = HashMap::new();
        for record in records.iter().filter(|record| record.id != root) {
            if let Some(referrer) = tree.referrer_of(record.id) {
                children_of.entry(referrer).or_default().push(record);
            }
        }

        let parts = NodeParts {
            children_of: &children_of,
            direct_counts: &direct_counts,
            amounts: &amounts,
        };
        let node = parts.node(&root_record, 0, depth);

        debug!(member = root, depth, nodes = node.size(), "Built network tree");
        Ok(Some(node))
    }
}

struct NodeParts<'a> {
    children_of: &'a HashMap<MemberId, Vec<&'a MemberRecord>>,
    direct_counts: &'a HashMap<MemberId, usize>,
    amounts: &'a HashMap<MemberId, AmountSummary>,
}

impl NodeParts<'_> {
    fn node(&self, record: &MemberRecord, level: usize, depth: usize) -> NetworkNode {
        let summary = self.amounts.get(&record.id).copied().unwrap_or_default();
        let children = if level < depth {
            self.children_of
                .get(&record.id)
                .into_iter()
                .flatten()
                .map(|child| self.node(child, level + 1, depth))
                .collect()
        } else {
            Vec::new()
        };

        NetworkNode {
            id: record.id,
            username: record.username.clone(),
            fullname: record.display_name().to_string(),
            level: record.level,
            direct_referrals: self.direct_counts.get(&record.id).copied().unwrap_or(0),
            total_commissions: summary.total,
            monthly_commissions: summary.windowed,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use affiliate_core::TransactionStatus;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn joined(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn member(id: MemberId, username: &str, referrer: Option<MemberId>, day: i64) -> MemberRecord {
        MemberRecord {
            created_at: Some(joined(day)),
            ..MemberRecord::new(id, username, referrer)
        }
    }

    fn builder(store: &Arc<InMemoryStore>) -> NetworkTreeBuilder {
        NetworkTreeBuilder::new(
            TreeGatherer::new(store.clone()),
            AmountAggregator::new(store.clone()),
            store.clone(),
        )
    }

    fn window() -> ReportWindow {
        ReportWindow::new(joined(400), joined(430))
    }

    fn store() -> Arc<InMemoryStore> {
        // 1 -> {3 (joined later), 2}, 2 -> {4}, 4 -> {5}
        let store = Arc::new(InMemoryStore::new());
        store.add_member_record(MemberRecord {
            fullname: Some("Root Member".to_string()),
            level: 3,
            ..member(1, "root", None, 0)
        });
        store.add_member_record(member(3, "late", Some(1), 20));
        store.add_member_record(member(2, "early", Some(1), 10));
        store.add_member_record(member(4, "grandchild", Some(2), 30));
        store.add_member_record(member(5, "deep", Some(4), 40));
        store.add_order(2, dec!(70), TransactionStatus::Completed, joined(410));
        store.add_order(2, dec!(30), TransactionStatus::Completed, joined(100));
        store
    }

    #[tokio::test]
    async fn builds_nested_tree_with_ordered_children() {
        let store = store();

        let root = builder(&store).build(1, 2, &window()).await.unwrap().unwrap();

        assert_eq!(root.fullname, "Root Member");
        assert_eq!(root.level, 3);
        assert_eq!(root.direct_referrals, 2);
        let child_ids: Vec<_> = root.children.iter().map(|c| c.id).collect();
        assert_eq!(child_ids, vec![2, 3]);

        let early = &root.children[0];
        assert_eq!(early.fullname, "early");
        assert_eq!(early.total_commissions, dec!(100));
        assert_eq!(early.monthly_commissions, dec!(70));
        assert_eq!(early.children.len(), 1);

        // depth 2 stops here but still counts the referral below
        let grandchild = &early.children[0];
        assert!(grandchild.children.is_empty());
        assert_eq!(grandchild.direct_referrals, 1);
        assert_eq!(root.size(), 4);
    }

    #[tokio::test]
    async fn batches_lookups_for_the_whole_tree() {
        let store = store();

        builder(&store).build(1, 2, &window()).await.unwrap();

        let counts = store.query_counts();
        assert_eq!(counts.members, 1);
        // levels 1 to 3, then level 4 would be past depth + 1
        assert_eq!(counts.referrals, 3);
    }

    #[tokio::test]
    async fn missing_root_yields_none() {
        let store = store();

        assert!(builder(&store).build(42, 3, &window()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn serializes_camel_case() {
        let store = store();

        let root = builder(&store).build(1, 1, &window()).await.unwrap().unwrap();
        let json = serde_json::to_value(&root).unwrap();

        assert_eq!(json["directReferrals"], 2);
        assert_eq!(json["level"], 3);
        assert!(json["children"][0]["totalCommissions"].is_number());
    }
}
