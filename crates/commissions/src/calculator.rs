//! Commission computation for one root member.

use affiliate_core::{CommissionSettings, MemberDirectory, MemberId, MemberRecord, ReportWindow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::amounts::AmountAggregator;
use crate::clock::Clock;
use crate::rates::{format_rate, rate_for_level, RateTable};
use crate::tree::TreeGatherer;

/// Currency metadata attached to every result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub code: String,
    pub symbol: String,
    /// Conversion fee in percent.
    pub conversion_rate: Decimal,
}

impl From<&CommissionSettings> for CurrencyInfo {
    fn from(settings: &CommissionSettings) -> Self {
        Self {
            code: settings.default_currency.clone(),
            symbol: settings.currency_symbol.clone(),
            conversion_rate: settings.conversion_rate,
        }
    }
}

/// Per-level and root totals for one member's downline.
///
/// Per-level vectors always have `depth` entries, index 0 being level 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResult {
    /// Every configured rate as a percent label.
    pub commission_rates: Vec<String>,
    /// Root member profile; `None` when the member record is missing.
    pub user: Option<MemberRecord>,
    pub depth: usize,
    /// Revenue of contributing members per level.
    pub per_level_sums: Vec<Decimal>,
    /// Number of members with positive revenue per level.
    pub per_level_counts: Vec<u64>,
    /// `per_level_sums[i] * rate[i]`.
    pub per_level_earnings: Vec<Decimal>,
    /// Root member's own lifetime revenue.
    pub total_commissions: Decimal,
    /// Root member's own revenue inside the reporting window.
    pub monthly_commissions: Decimal,
    #[serde(rename = "generated_at")]
    pub generated_at: DateTime<Utc>,
    pub currency: String,
    pub currency_symbol: String,
    pub conversion_rate: Decimal,
}

impl CommissionResult {
    /// Sum of earnings across all levels.
    #[must_use]
    pub fn total_earnings(&self) -> Decimal {
        self.per_level_earnings.iter().copied().sum()
    }

    /// Number of contributing members across all levels.
    #[must_use]
    pub fn contributing_members(&self) -> u64 {
        self.per_level_counts.iter().sum()
    }
}

pub struct CommissionCalculator {
    gatherer: TreeGatherer,
    aggregator: AmountAggregator,
    rates: Arc<RateTable>,
    members: Arc<dyn MemberDirectory>,
    currency: CurrencyInfo,
    clock: Arc<dyn Clock>,
}

impl CommissionCalculator {
    #[must_use]
    pub fn new(
        gatherer: TreeGatherer,
        aggregator: AmountAggregator,
        rates: Arc<RateTable>,
        members: Arc<dyn MemberDirectory>,
        currency: CurrencyInfo,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gatherer,
            aggregator,
            rates,
            members,
            currency,
            clock,
        }
    }

    /// Computes per-level sums, counts, and earnings for `root`'s downline.
    ///
    /// One BFS, one batched aggregation over the union of every discovered
    /// member plus the root, then a fold. `max_depth` is expected to be
    /// clamped already.
    ///
    /// # Errors
    /// Returns an error if tree discovery or revenue aggregation fails.
    pub async fn compute(
        &self,
        root: MemberId,
        max_depth: usize,
        window: &ReportWindow,
    ) -> Result<CommissionResult> {
        let tree = self.gatherer.gather_levels(root, max_depth).await?;

        let mut union: Vec<MemberId> = tree.members().collect();
        union.push(root);
        let amounts = self.aggregator.batch_load(&union, window).await?;

        let mut per_level_sums = vec![Decimal::ZERO; max_depth];
        let mut per_level_counts = vec![0_u64; max_depth];
        for (level, members) in tree.iter() {
            let Some(idx) = level.checked_sub(1).filter(|idx| *idx < max_depth) else {
                continue;
            };
            for summary in members.iter().filter_map(|id| amounts.get(id)) {
                if summary.is_contributing() {
                    per_level_sums[idx] += summary.total;
                    per_level_counts[idx] += 1;
                }
            }
        }

        let rates = self.rates.rates().await;
        let per_level_earnings: Vec<Decimal> = per_level_sums
            .iter()
            .enumerate()
            .map(|(idx, sum)| *sum * rate_for_level(&rates, idx + 1))
            .collect();

        let root_amounts = amounts.get(&root).copied().unwrap_or_default();
        let user = self.root_profile(root).await;

        debug!(
            member = root,
            depth = max_depth,
            members = tree.member_count(),
            "Computed commissions"
        );

        Ok(CommissionResult {
            commission_rates: rates.iter().copied().map(format_rate).collect(),
            user,
            depth: max_depth,
            per_level_sums,
            per_level_counts,
            per_level_earnings,
            total_commissions: root_amounts.total,
            monthly_commissions: root_amounts.windowed,
            generated_at: self.clock.now(),
            currency: self.currency.code.clone(),
            currency_symbol: self.currency.symbol.clone(),
            conversion_rate: self.currency.conversion_rate,
        })
    }

    async fn root_profile(&self, root: MemberId) -> Option<MemberRecord> {
        match self.members.find_member(root).await {
            Ok(member) => member,
            Err(e) => {
                warn!(member = root, error = %e, "Failed to load member profile");
                None
            }
        }
    }
}
