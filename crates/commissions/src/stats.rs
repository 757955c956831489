//! Membership-wide network statistics.
//!
//! Revenue comes from completed orders across every member. When both the
//! lifetime and windowed order totals are zero, the paid commission ledger
//! supplies both figures instead. A ledger failure at that point leaves the
//! figures at zero rather than failing the report.

use affiliate_core::{LevelCount, MemberDirectory, ReportWindow, RevenueLedger};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::amounts::AmountSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_commissions: Decimal,
    pub monthly_commissions: Decimal,
    pub source: AmountSource,
    pub level_distribution: Vec<LevelCount>,
}

pub struct NetworkStatsService {
    ledger: Arc<dyn RevenueLedger>,
    members: Arc<dyn MemberDirectory>,
}

impl NetworkStatsService {
    #[must_use]
    pub fn new(ledger: Arc<dyn RevenueLedger>, members: Arc<dyn MemberDirectory>) -> Self {
        Self { ledger, members }
    }

    /// Head counts, tier distribution, and revenue totals for `window`.
    ///
    /// # Errors
    /// Returns an error if the head count or order totals cannot be loaded.
    pub async fn stats(&self, window: &ReportWindow) -> Result<NetworkStats> {
        let census = self.members.census().await?;
        let total = self.ledger.completed_order_grand_total(None).await?;
        let windowed = self.ledger.completed_order_grand_total(Some(window)).await?;

        let (total, windowed, source) = if total.is_zero() && windowed.is_zero() {
            self.paid_totals(window).await
        } else {
            (total, windowed, AmountSource::Orders)
        };

        debug!(
            members = census.total_users,
            source = ?source,
            "Computed network statistics"
        );

        Ok(NetworkStats {
            total_users: census.total_users,
            active_users: census.active_users,
            total_commissions: total,
            monthly_commissions: windowed,
            source,
            level_distribution: census.level_distribution,
        })
    }

    async fn paid_totals(&self, window: &ReportWindow) -> (Decimal, Decimal, AmountSource) {
        let totals = async {
            let total = self.ledger.paid_commission_grand_total(None).await?;
            let windowed = self.ledger.paid_commission_grand_total(Some(window)).await?;
            anyhow::Ok((total, windowed))
        };

        match totals.await {
            Ok((total, windowed)) if !(total.is_zero() && windowed.is_zero()) => {
                (total, windowed, AmountSource::PaidCommissions)
            }
            Ok(_) => (Decimal::ZERO, Decimal::ZERO, AmountSource::None),
            Err(err) => {
                warn!(error = ?err, "Paid commission totals unavailable, reporting zero");
                (Decimal::ZERO, Decimal::ZERO, AmountSource::None)
            }
        }
    }
}
