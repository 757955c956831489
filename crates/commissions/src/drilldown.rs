//! Paginated transaction listing for a single tree level.

use affiliate_core::{CommissionSettings, MemberId, TransactionRecord, TransactionSource};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::tree::TreeGatherer;

/// One page of completed transactions plus the unpaginated total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrilldownPage {
    pub data: Vec<TransactionRecord>,
    pub total: i64,
}

impl DrilldownPage {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Normalized paging request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub level: usize,
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Clamps level into `[1, max_depth]`, page to at least 1, and the page
    /// size into the configured bounds.
    #[must_use]
    pub fn normalized(settings: &CommissionSettings, level: i64, page: i64, per_page: i64) -> Self {
        Self {
            level: settings.clamp_depth(level),
            page: page.max(1),
            per_page: settings.clamp_per_page(per_page),
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

pub struct DrilldownService {
    gatherer: TreeGatherer,
    transactions: Arc<dyn TransactionSource>,
    settings: CommissionSettings,
}

impl DrilldownService {
    #[must_use]
    pub fn new(
        gatherer: TreeGatherer,
        transactions: Arc<dyn TransactionSource>,
        settings: CommissionSettings,
    ) -> Self {
        Self {
            gatherer,
            transactions,
            settings,
        }
    }

    /// Lists completed transactions owned by members exactly `level` below
    /// `root`, newest first.
    ///
    /// An empty level returns an empty page without touching transactions.
    ///
    /// # Errors
    /// Returns an error if tree discovery or a transaction query fails.
    pub async fn list_transactions(
        &self,
        root: MemberId,
        level: i64,
        page: i64,
        per_page: i64,
    ) -> Result<DrilldownPage> {
        let request = PageRequest::normalized(&self.settings, level, page, per_page);

        let tree = self.gatherer.gather_levels(root, request.level).await?;
        let owners: Vec<MemberId> = tree.level(request.level).collect();
        if owners.is_empty() {
            debug!(member = root, level = request.level, "Drill-down level is empty");
            return Ok(DrilldownPage::empty());
        }

        let data = self
            .transactions
            .completed_transactions(&owners, request.per_page, request.offset())
            .await?;
        let total = self.transactions.count_completed(&owners).await?;

        debug!(
            member = root,
            level = request.level,
            members = owners.len(),
            page = request.page,
            rows = data.len(),
            total,
            "Listed drill-down transactions"
        );

        Ok(DrilldownPage { data, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use affiliate_core::TransactionStatus;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn service(store: &Arc<InMemoryStore>) -> DrilldownService {
        DrilldownService::new(
            TreeGatherer::new(store.clone()),
            store.clone(),
            CommissionSettings::default(),
        )
    }

    fn store_with_orders() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.add_member(1, "root", None);
        store.add_member(2, "alice", Some(1));
        store.add_member(3, "bob", Some(2));
        let base = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        for i in 0..3 {
            store.add_order(
                2,
                dec!(10) + rust_decimal::Decimal::from(i),
                TransactionStatus::Completed,
                base + Duration::hours(i),
            );
        }
        store.add_order(2, dec!(99), TransactionStatus::Pending, base);
        store.add_order(3, dec!(5), TransactionStatus::Completed, base);
        store
    }

    #[test]
    fn page_request_clamps_inputs() {
        let settings = CommissionSettings::default();

        let request = PageRequest::normalized(&settings, 42, -3, 5000);
        assert_eq!(request.level, 9);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 200);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::normalized(&settings, 0, 4, 1);
        assert_eq!(request.level, 1);
        assert_eq!(request.per_page, 10);
        assert_eq!(request.offset(), 30);
    }

    #[tokio::test]
    async fn lists_only_the_requested_level_newest_first() {
        let store = store_with_orders();

        let page = service(&store).list_transactions(1, 1, 1, 50).await.unwrap();

        assert_eq!(page.total, 3);
        let amounts: Vec<_> = page.data.iter().map(|row| row.amount).collect();
        assert_eq!(amounts, vec![dec!(12), dec!(11), dec!(10)]);
        assert!(page.data.iter().all(|row| row.username == "alice"));
    }

    #[tokio::test]
    async fn empty_level_skips_transaction_queries() {
        let store = store_with_orders();

        let page = service(&store).list_transactions(1, 5, 1, 50).await.unwrap();

        assert_eq!(page, DrilldownPage::empty());
        assert_eq!(store.query_counts().transactions, 0);
    }

    #[tokio::test]
    async fn page_past_the_end_keeps_total() {
        let store = store_with_orders();

        let page = service(&store).list_transactions(1, 2, 7, 10).await.unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.total, 1);
    }
}
