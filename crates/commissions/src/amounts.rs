//! Batched revenue aggregation.
//!
//! Revenue comes from completed orders. Members whose lifetime order total
//! is exactly zero fall back to the paid commission ledger, where revenue
//! may have been recorded as already-distributed commission. The two sources
//! are exclusive per member: a member's figures come wholly from one of them.

use affiliate_core::{MemberId, MemberTotals, ReportWindow, RevenueLedger};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Where a member's figures came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountSource {
    Orders,
    PaidCommissions,
    #[default]
    None,
}

/// Revenue figures for one member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AmountSummary {
    /// All-time revenue.
    pub total: Decimal,
    /// Revenue inside the reporting window.
    pub windowed: Decimal,
    pub source: AmountSource,
}

impl AmountSummary {
    /// Whether this member counts toward per-level sums.
    #[must_use]
    pub fn is_contributing(&self) -> bool {
        self.total > Decimal::ZERO
    }
}

pub struct AmountAggregator {
    ledger: Arc<dyn RevenueLedger>,
}

impl AmountAggregator {
    #[must_use]
    pub fn new(ledger: Arc<dyn RevenueLedger>) -> Self {
        Self { ledger }
    }

    /// Loads lifetime and windowed revenue for every member in `members`.
    ///
    /// Issues two grouped sums against orders, plus two against the ledger
    /// only when some member has a zero order total. Every requested member
    /// is present in the result. An empty input issues no query.
    ///
    /// # Errors
    /// Returns an error if any grouped sum fails.
    pub async fn batch_load(
        &self,
        members: &[MemberId],
        window: &ReportWindow,
    ) -> Result<HashMap<MemberId, AmountSummary>> {
        let mut ids = members.to_vec();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let order_totals = self.ledger.completed_order_totals(&ids, None).await?;
        let order_windowed = self
            .ledger
            .completed_order_totals(&ids, Some(window))
            .await?;

        let needs_fallback: Vec<MemberId> = ids
            .iter()
            .copied()
            .filter(|id| amount_of(&order_totals, *id).is_zero())
            .collect();

        let (ledger_totals, ledger_windowed) = if needs_fallback.is_empty() {
            (MemberTotals::new(), MemberTotals::new())
        } else {
            let totals = self
                .ledger
                .paid_commission_totals(&needs_fallback, None)
                .await?;
            let windowed = self
                .ledger
                .paid_commission_totals(&needs_fallback, Some(window))
                .await?;
            (totals, windowed)
        };

        debug!(
            members = ids.len(),
            fallback_candidates = needs_fallback.len(),
            "Aggregated member revenue"
        );

        Ok(ids
            .into_iter()
            .map(|id| {
                let order_total = amount_of(&order_totals, id);
                let ledger_total = amount_of(&ledger_totals, id);

                let summary = if order_total.is_zero() && ledger_total > Decimal::ZERO {
                    AmountSummary {
                        total: ledger_total,
                        windowed: amount_of(&ledger_windowed, id),
                        source: AmountSource::PaidCommissions,
                    }
                } else if order_total.is_zero() {
                    AmountSummary::default()
                } else {
                    AmountSummary {
                        total: order_total,
                        windowed: amount_of(&order_windowed, id),
                        source: AmountSource::Orders,
                    }
                };
                (id, summary)
            })
            .collect())
    }
}

fn amount_of(totals: &MemberTotals, id: MemberId) -> Decimal {
    totals.get(&id).copied().unwrap_or(Decimal::ZERO)
}
