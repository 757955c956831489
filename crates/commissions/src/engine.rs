//! Entry point wiring every commission component over one backing store.

use affiliate_core::{BackingStore, CommissionSettings, MemberId, ReportRange};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::amounts::AmountAggregator;
use crate::cache::ResultCache;
use crate::calculator::{CommissionCalculator, CommissionResult, CurrencyInfo};
use crate::clock::{Clock, SystemClock};
use crate::drilldown::{DrilldownPage, DrilldownService};
use crate::network::{NetworkNode, NetworkTreeBuilder};
use crate::rates::RateTable;
use crate::search::{MemberMatch, MemberSearch};
use crate::stats::{NetworkStats, NetworkStatsService};
use crate::tree::TreeGatherer;

pub struct CommissionEngine {
    settings: CommissionSettings,
    clock: Arc<dyn Clock>,
    rates: Arc<RateTable>,
    calculator: Arc<CommissionCalculator>,
    cache: ResultCache,
    drilldown: DrilldownService,
    network: NetworkTreeBuilder,
    stats: NetworkStatsService,
    search: MemberSearch,
}

impl CommissionEngine {
    #[must_use]
    pub fn new(store: BackingStore, settings: CommissionSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        store: BackingStore,
        settings: CommissionSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rates = Arc::new(RateTable::new(Arc::clone(&store.rates)));
        let calculator = Arc::new(CommissionCalculator::new(
            TreeGatherer::new(Arc::clone(&store.referrals)),
            AmountAggregator::new(Arc::clone(&store.revenue)),
            Arc::clone(&rates),
            Arc::clone(&store.members),
            CurrencyInfo::from(&settings),
            Arc::clone(&clock),
        ));
        let cache = ResultCache::new(Arc::clone(&calculator), Arc::clone(&clock));
        let drilldown = DrilldownService::new(
            TreeGatherer::new(Arc::clone(&store.referrals)),
            Arc::clone(&store.transactions),
            settings.clone(),
        );
        let network = NetworkTreeBuilder::new(
            TreeGatherer::new(Arc::clone(&store.referrals)),
            AmountAggregator::new(Arc::clone(&store.revenue)),
            Arc::clone(&store.members),
        );
        let stats =
            NetworkStatsService::new(Arc::clone(&store.revenue), Arc::clone(&store.members));
        let search = MemberSearch::new(Arc::clone(&store.members));

        info!(
            max_depth = settings.max_depth,
            cache_ttl_secs = settings.cache_ttl_secs,
            "Commission engine ready"
        );

        Self {
            settings,
            clock,
            rates,
            calculator,
            cache,
            drilldown,
            network,
            stats,
            search,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &CommissionSettings {
        &self.settings
    }

    /// Commission totals for `root`'s downline.
    ///
    /// `depth` defaults to the configured depth and is clamped to the
    /// ceiling. Month reports go through the result cache; other ranges are
    /// computed fresh.
    ///
    /// # Errors
    /// Returns an error if tree discovery or revenue aggregation fails.
    pub async fn commissions(
        &self,
        root: MemberId,
        depth: Option<i64>,
        range: ReportRange,
    ) -> Result<Arc<CommissionResult>> {
        let depth = self.resolve_depth(depth, self.settings.default_depth);
        let window = range.window_at(self.clock.now());

        if range == ReportRange::default() {
            return self
                .cache
                .get_or_compute(root, depth, &window, self.settings.cache_ttl())
                .await;
        }

        debug!(member = root, depth, range = range.as_str(), "Computing uncached range");
        Ok(Arc::new(self.calculator.compute(root, depth, &window).await?))
    }

    /// One page of completed transactions at a single level below `root`.
    ///
    /// # Errors
    /// Returns an error if tree discovery or a transaction query fails.
    pub async fn drilldown(
        &self,
        root: MemberId,
        level: i64,
        page: i64,
        per_page: Option<i64>,
    ) -> Result<DrilldownPage> {
        let per_page = per_page.unwrap_or(self.settings.per_page);
        self.drilldown
            .list_transactions(root, level, page, per_page)
            .await
    }

    /// Nested network tree below `root`; `None` if the member does not exist.
    ///
    /// # Errors
    /// Returns an error if discovery, the member lookup, or aggregation fails.
    pub async fn network_tree(
        &self,
        root: MemberId,
        depth: Option<i64>,
        range: ReportRange,
    ) -> Result<Option<NetworkNode>> {
        let depth = self.resolve_depth(depth, self.settings.network_depth);
        let window = range.window_at(self.clock.now());
        self.network.build(root, depth, &window).await
    }

    /// Membership-wide head counts and revenue totals for `range`.
    ///
    /// # Errors
    /// Returns an error if the head count or order totals cannot be loaded.
    pub async fn network_stats(&self, range: ReportRange) -> Result<NetworkStats> {
        let window = range.window_at(self.clock.now());
        self.stats.stats(&window).await
    }

    /// Members matching a partial username, email, or full name.
    ///
    /// # Errors
    /// Returns an error if the member lookup fails.
    pub async fn search_members(&self, query: &str) -> Result<Vec<MemberMatch>> {
        self.search.search(query).await
    }

    /// Forces the rate table to reload on next use.
    pub async fn refresh_rates(&self) {
        self.rates.invalidate().await;
    }

    /// Drops cached results older than the configured TTL.
    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired(self.settings.cache_ttl()).await
    }

    /// Drops the cached result for `(root, depth)` after clamping `depth`.
    pub async fn invalidate(&self, root: MemberId, depth: Option<i64>) -> bool {
        let depth = self.resolve_depth(depth, self.settings.default_depth);
        self.cache.invalidate(root, depth).await
    }

    pub async fn cached_results(&self) -> usize {
        self.cache.len().await
    }

    fn resolve_depth(&self, requested: Option<i64>, fallback: usize) -> usize {
        let fallback = i64::try_from(fallback).unwrap_or(i64::MAX);
        self.settings.clamp_depth(requested.unwrap_or(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::InMemoryStore;
    use affiliate_core::TransactionStatus;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        engine: CommissionEngine,
    }

    fn fixture() -> Fixture {
        let now = Utc.with_ymd_and_hms(2025, 5, 14, 10, 0, 0).unwrap();
        let store = Arc::new(InMemoryStore::new());
        store.add_member(1, "root", None);
        store.add_member(2, "a", Some(1));
        store.add_member(3, "b", Some(2));
        store.add_order(2, dec!(100), TransactionStatus::Completed, now);
        store.add_order(3, dec!(40), TransactionStatus::Completed, now);
        store.set_rates(vec![dec!(0.10), dec!(0.05)]);

        let clock = Arc::new(ManualClock::new(now));
        let engine = CommissionEngine::with_clock(
            store.backing_store(),
            CommissionSettings::default(),
            clock.clone(),
        );
        Fixture {
            store,
            clock,
            engine,
        }
    }

    #[tokio::test]
    async fn depth_defaults_and_clamps() {
        let f = fixture();

        let default = f.engine.commissions(1, None, ReportRange::Month).await.unwrap();
        let clamped = f.engine.commissions(1, Some(50), ReportRange::Month).await.unwrap();
        let shallow = f.engine.commissions(1, Some(-2), ReportRange::Month).await.unwrap();

        assert_eq!(default.depth, 9);
        assert!(Arc::ptr_eq(&default, &clamped));
        assert_eq!(shallow.depth, 1);
        assert_eq!(shallow.per_level_sums, vec![dec!(100)]);
    }

    #[tokio::test]
    async fn month_is_cached_other_ranges_are_not() {
        let f = fixture();

        let a = f.engine.commissions(1, Some(3), ReportRange::Month).await.unwrap();
        let b = f.engine.commissions(1, Some(3), ReportRange::Month).await.unwrap();
        let c = f.engine.commissions(1, Some(3), ReportRange::Year).await.unwrap();
        let d = f.engine.commissions(1, Some(3), ReportRange::Year).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&c, &d));
        assert_eq!(f.engine.cached_results().await, 1);
    }

    #[tokio::test]
    async fn refresh_rates_reloads_on_next_miss() {
        let f = fixture();

        let before = f.engine.commissions(1, Some(1), ReportRange::Week).await.unwrap();
        f.store.set_rates(vec![dec!(0.20)]);
        f.engine.refresh_rates().await;
        let after = f.engine.commissions(1, Some(1), ReportRange::Week).await.unwrap();

        assert_eq!(before.per_level_earnings, vec![dec!(10)]);
        assert_eq!(after.per_level_earnings, vec![dec!(20)]);
    }

    #[tokio::test]
    async fn purge_and_invalidate_manage_the_cache() {
        let f = fixture();

        f.engine.commissions(1, Some(2), ReportRange::Month).await.unwrap();
        assert!(f.engine.invalidate(1, Some(2)).await);
        f.engine.commissions(1, Some(2), ReportRange::Month).await.unwrap();

        f.clock.advance(Duration::seconds(301));
        assert_eq!(f.engine.purge_expired().await, 1);
        assert_eq!(f.engine.cached_results().await, 0);
    }

    #[tokio::test]
    async fn drilldown_uses_configured_page_size() {
        let f = fixture();

        let page = f.engine.drilldown(1, 2, 1, None).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].user_id, 3);
    }

    #[tokio::test]
    async fn network_tree_defaults_to_configured_depth() {
        let f = fixture();

        let tree = f
            .engine
            .network_tree(1, None, ReportRange::Month)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children[0].id, 3);
    }

    #[tokio::test]
    async fn network_stats_use_the_requested_range() {
        let f = fixture();
        let earlier = Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap();
        f.store.add_order(1, dec!(60), TransactionStatus::Completed, earlier);

        let month = f.engine.network_stats(ReportRange::Month).await.unwrap();
        let year = f.engine.network_stats(ReportRange::Year).await.unwrap();

        assert_eq!(month.total_users, 3);
        assert_eq!(month.total_commissions, dec!(200));
        assert_eq!(month.monthly_commissions, dec!(140));
        assert_eq!(year.monthly_commissions, dec!(200));
    }

    #[tokio::test]
    async fn search_members_matches_usernames() {
        let f = fixture();

        let hits = f.engine.search_members("ro").await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "root");
    }
}
