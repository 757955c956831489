//! In-process backing store.
//!
//! Implements every storage trait over plain tables held in memory, with the
//! same filtering and ordering as the PostgreSQL repositories. Each trait
//! call is counted, so callers can assert how many batched lookups an
//! operation issued. Compiled for tests and behind the `testing` feature.

use affiliate_core::{
    BackingStore, LedgerStatus, LevelCount, MemberCensus, MemberDirectory, MemberId,
    MemberRecord, MemberTotals, RateSource, Referral, ReferralGraph, ReportWindow, RevenueLedger, TransactionRecord,
    TransactionSource, TransactionStatus,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Number of storage calls served, per trait.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryCounts {
    pub referrals: usize,
    pub revenue: usize,
    pub rates: usize,
    pub members: usize,
    pub transactions: usize,
}

#[derive(Debug, Clone)]
struct StoredOrder {
    id: i64,
    member_id: MemberId,
    amount: Decimal,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredLedgerEntry {
    member_id: MemberId,
    amount: Decimal,
    status: LedgerStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    members: BTreeMap<MemberId, MemberRecord>,
    orders: Vec<StoredOrder>,
    ledger: Vec<StoredLedgerEntry>,
    rates: Vec<Decimal>,
    next_order_id: i64,
}

#[derive(Debug, Default)]
struct Counters {
    referrals: AtomicUsize,
    revenue: AtomicUsize,
    rates: AtomicUsize,
    members: AtomicUsize,
    transactions: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    counters: Counters,
    fail_rates: AtomicBool,
    fail_revenue: AtomicBool,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine handles that all point at this store.
    #[must_use]
    pub fn backing_store(self: &Arc<Self>) -> BackingStore {
        BackingStore::from_shared(Arc::clone(self))
    }

    pub fn add_member(&self, id: MemberId, username: &str, referrer_id: Option<MemberId>) {
        self.add_member_record(MemberRecord::new(id, username, referrer_id));
    }

    pub fn add_member_record(&self, member: MemberRecord) {
        self.write().members.insert(member.id, member);
    }

    /// Adds an order and returns its identifier.
    pub fn add_order(
        &self,
        member_id: MemberId,
        amount: Decimal,
        status: TransactionStatus,
        created_at: DateTime<Utc>,
    ) -> i64 {
        let mut tables = self.write();
        tables.next_order_id += 1;
        let id = tables.next_order_id;
        tables.orders.push(StoredOrder {
            id,
            member_id,
            amount,
            status,
            created_at,
        });
        id
    }

    pub fn add_ledger_entry(
        &self,
        member_id: MemberId,
        amount: Decimal,
        status: LedgerStatus,
        created_at: DateTime<Utc>,
    ) {
        self.write().ledger.push(StoredLedgerEntry {
            member_id,
            amount,
            status,
            created_at,
        });
    }

    pub fn add_paid_commission(
        &self,
        member_id: MemberId,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) {
        self.add_ledger_entry(member_id, amount, LedgerStatus::Paid, created_at);
    }

    /// Replaces the rate table; index 0 is level 1.
    pub fn set_rates(&self, rates: Vec<Decimal>) {
        self.write().rates = rates;
    }

    /// Makes subsequent rate loads fail.
    pub fn fail_rate_loads(&self, fail: bool) {
        self.fail_rates.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent revenue queries fail.
    pub fn fail_revenue_queries(&self, fail: bool) {
        self.fail_revenue.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn query_counts(&self) -> QueryCounts {
        QueryCounts {
            referrals: self.counters.referrals.load(Ordering::SeqCst),
            revenue: self.counters.revenue.load(Ordering::SeqCst),
            rates: self.counters.rates.load(Ordering::SeqCst),
            members: self.counters.members.load(Ordering::SeqCst),
            transactions: self.counters.transactions.load(Ordering::SeqCst),
        }
    }

    pub fn reset_counts(&self) {
        for counter in [
            &self.counters.referrals,
            &self.counters.revenue,
            &self.counters.rates,
            &self.counters.members,
            &self.counters.transactions,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn sum_by_member<I>(rows: I, members: &[MemberId]) -> MemberTotals
    where
        I: Iterator<Item = (MemberId, Decimal)>,
    {
        let wanted: HashSet<MemberId> = members.iter().copied().collect();
        let mut totals = MemberTotals::new();
        for (member, amount) in rows.filter(|(member, _)| wanted.contains(member)) {
            *totals.entry(member).or_insert(Decimal::ZERO) += amount;
        }
        totals
    }

    fn order_rows<'a>(
        tables: &'a Tables,
        window: Option<&'a ReportWindow>,
    ) -> impl Iterator<Item = (MemberId, Decimal)> + 'a {
        tables
            .orders
            .iter()
            .filter(|order| order.status.is_revenue())
            .filter(move |order| window.map_or(true, |w| w.contains(order.created_at)))
            .map(|order| (order.member_id, order.amount))
    }

    fn ledger_rows<'a>(
        tables: &'a Tables,
        window: Option<&'a ReportWindow>,
    ) -> impl Iterator<Item = (MemberId, Decimal)> + 'a {
        tables
            .ledger
            .iter()
            .filter(|entry| entry.status == LedgerStatus::Paid)
            .filter(move |entry| window.map_or(true, |w| w.contains(entry.created_at)))
            .map(|entry| (entry.member_id, entry.amount))
    }

    fn check_revenue(&self) -> Result<()> {
        if self.fail_revenue.load(Ordering::SeqCst) {
            anyhow::bail!("simulated revenue query failure");
        }
        Ok(())
    }
}

#[async_trait]
impl ReferralGraph for InMemoryStore {
    async fn referrals_of(&self, referrers: &[MemberId]) -> Result<Vec<Referral>> {
        self.counters.referrals.fetch_add(1, Ordering::SeqCst);
        let referrers: HashSet<MemberId> = referrers.iter().copied().collect();
        Ok(self
            .read()
            .members
            .values()
            .filter_map(|member| {
                let referrer_id = member.referrer_id?;
                referrers.contains(&referrer_id).then_some(Referral {
                    member_id: member.id,
                    referrer_id,
                })
            })
            .collect())
    }
}

#[async_trait]
impl RevenueLedger for InMemoryStore {
    async fn completed_order_totals(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        self.counters.revenue.fetch_add(1, Ordering::SeqCst);
        self.check_revenue()?;
        let tables = self.read();
        Ok(Self::sum_by_member(Self::order_rows(&tables, window), members))
    }

    async fn paid_commission_totals(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        self.counters.revenue.fetch_add(1, Ordering::SeqCst);
        self.check_revenue()?;
        let tables = self.read();
        Ok(Self::sum_by_member(Self::ledger_rows(&tables, window), members))
    }

    async fn completed_order_grand_total(
        &self,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal> {
        self.counters.revenue.fetch_add(1, Ordering::SeqCst);
        self.check_revenue()?;
        let tables = self.read();
        Ok(Self::order_rows(&tables, window).map(|(_, amount)| amount).sum())
    }

    async fn paid_commission_grand_total(
        &self,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal> {
        self.counters.revenue.fetch_add(1, Ordering::SeqCst);
        self.check_revenue()?;
        let tables = self.read();
        Ok(Self::ledger_rows(&tables, window).map(|(_, amount)| amount).sum())
    }
}

#[async_trait]
impl RateSource for InMemoryStore {
    async fn load_rates(&self) -> Result<Vec<Decimal>> {
        self.counters.rates.fetch_add(1, Ordering::SeqCst);
        if self.fail_rates.load(Ordering::SeqCst) {
            anyhow::bail!("simulated rate table failure");
        }
        Ok(self.read().rates.clone())
    }
}

#[async_trait]
impl MemberDirectory for InMemoryStore {
    async fn find_member(&self, id: MemberId) -> Result<Option<MemberRecord>> {
        self.counters.members.fetch_add(1, Ordering::SeqCst);
        Ok(self.read().members.get(&id).cloned())
    }

    async fn find_members(&self, ids: &[MemberId]) -> Result<Vec<MemberRecord>> {
        self.counters.members.fetch_add(1, Ordering::SeqCst);
        let tables = self.read();
        let wanted: HashSet<MemberId> = ids.iter().copied().collect();
        let mut members: Vec<MemberRecord> = tables
            .members
            .values()
            .filter(|member| wanted.contains(&member.id))
            .cloned()
            .collect();
        members.sort_by_key(|member| (member.created_at.is_none(), member.created_at, member.id));
        Ok(members)
    }

    async fn search_members(&self, term: &str, limit: i64) -> Result<Vec<MemberRecord>> {
        self.counters.members.fetch_add(1, Ordering::SeqCst);
        let needle = term.to_lowercase();
        let matches = |field: Option<&str>| {
            field.is_some_and(|value| value.to_lowercase().contains(&needle))
        };
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(self
            .read()
            .members
            .values()
            .filter(|member| {
                matches(Some(&member.username))
                    || matches(member.email.as_deref())
                    || matches(member.fullname.as_deref())
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn census(&self) -> Result<MemberCensus> {
        self.counters.members.fetch_add(1, Ordering::SeqCst);
        let tables = self.read();
        let mut levels: BTreeMap<i32, i64> = BTreeMap::new();
        for member in tables.members.values() {
            *levels.entry(member.level).or_default() += 1;
        }

        let active = tables.members.values().filter(|m| m.is_active()).count();

        Ok(MemberCensus {
            total_users: i64::try_from(tables.members.len()).unwrap_or(i64::MAX),
            active_users: i64::try_from(active).unwrap_or(i64::MAX),
            level_distribution: levels
                .into_iter()
                .map(|(level, count)| LevelCount { level, count })
                .collect(),
        })
    }
}

#[async_trait]
impl TransactionSource for InMemoryStore {
    async fn completed_transactions(
        &self,
        owners: &[MemberId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        self.counters.transactions.fetch_add(1, Ordering::SeqCst);
        let tables = self.read();
        let owners: HashSet<MemberId> = owners.iter().copied().collect();

        let mut orders: Vec<&StoredOrder> = tables
            .orders
            .iter()
            .filter(|order| order.status.is_revenue() && owners.contains(&order.member_id))
            .filter(|order| tables.members.contains_key(&order.member_id))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(orders
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|order| TransactionRecord {
                id: order.id,
                user_id: order.member_id,
                username: tables
                    .members
                    .get(&order.member_id)
                    .map(|member| member.username.clone())
                    .unwrap_or_default(),
                amount: order.amount,
                status: order.status,
                created_at: order.created_at,
            })
            .collect())
    }

    async fn count_completed(&self, owners: &[MemberId]) -> Result<i64> {
        self.counters.transactions.fetch_add(1, Ordering::SeqCst);
        let owners: HashSet<MemberId> = owners.iter().copied().collect();
        let tables = self.read();
        let count = tables
            .orders
            .iter()
            .filter(|order| order.status.is_revenue() && owners.contains(&order.member_id))
            .filter(|order| tables.members.contains_key(&order.member_id))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}
