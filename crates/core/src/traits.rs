//! Read-only storage seams consumed by the commission engine.
//!
//! Every method that takes a member set issues one batched lookup for the
//! whole set. Implementations must not be called with an empty set; callers
//! short-circuit before reaching the store.

use crate::models::{MemberCensus, MemberId, MemberRecord, Referral, TransactionRecord};
use crate::window::ReportWindow;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Grouped sums keyed by owning member. Members with no rows are absent.
pub type MemberTotals = HashMap<MemberId, Decimal>;

#[async_trait]
pub trait ReferralGraph: Send + Sync {
    /// Members whose referrer is any of `referrers`.
    async fn referrals_of(&self, referrers: &[MemberId]) -> Result<Vec<Referral>>;
}

#[async_trait]
pub trait RevenueLedger: Send + Sync {
    /// Sum of completed order amounts per member, optionally restricted to `window`.
    async fn completed_order_totals(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals>;

    /// Sum of paid commission ledger entries per member, optionally restricted to `window`.
    async fn paid_commission_totals(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals>;

    /// Completed order amount across all members, optionally restricted to `window`.
    async fn completed_order_grand_total(
        &self,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal>;

    /// Paid commission amount across all members, optionally restricted to `window`.
    async fn paid_commission_grand_total(
        &self,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Commission rates ordered by level; index 0 is level 1.
    async fn load_rates(&self) -> Result<Vec<Decimal>>;
}

#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_member(&self, id: MemberId) -> Result<Option<MemberRecord>>;

    async fn find_members(&self, ids: &[MemberId]) -> Result<Vec<MemberRecord>>;

    /// Members whose username, email, or full name contains `term`, ignoring
    /// case, ordered by id and capped at `limit`.
    async fn search_members(&self, term: &str, limit: i64) -> Result<Vec<MemberRecord>>;

    /// Head counts over the whole membership.
    async fn census(&self) -> Result<MemberCensus>;
}

#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Completed transactions owned by `owners`, newest first.
    async fn completed_transactions(
        &self,
        owners: &[MemberId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>>;

    /// Number of completed transactions owned by `owners`.
    async fn count_completed(&self, owners: &[MemberId]) -> Result<i64>;
}

/// Handles to every store the engine reads from.
#[derive(Clone)]
pub struct BackingStore {
    pub referrals: Arc<dyn ReferralGraph>,
    pub revenue: Arc<dyn RevenueLedger>,
    pub rates: Arc<dyn RateSource>,
    pub members: Arc<dyn MemberDirectory>,
    pub transactions: Arc<dyn TransactionSource>,
}

impl BackingStore {
    /// Uses one value for every store, for backends that implement all traits.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: ReferralGraph + RevenueLedger + RateSource + MemberDirectory + TransactionSource + 'static,
    {
        Self {
            referrals: store.clone(),
            revenue: store.clone(),
            rates: store.clone(),
            members: store.clone(),
            transactions: store,
        }
    }
}
