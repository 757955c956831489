//! Revenue repository.
//!
//! Per-member and overall sums over `orders` (primary revenue) and
//! `commissions` (paid payout ledger, used as the fallback source).

use affiliate_core::{
    LedgerStatus, MemberId, MemberTotals, ReportWindow, RevenueLedger, TransactionStatus,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::distinct_ids;

/// Repository for per-member revenue aggregates.
#[derive(Debug, Clone)]
pub struct RevenueRepository {
    pool: PgPool,
}

impl RevenueRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Sums completed order amounts per member.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn sum_completed_orders(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        self.grouped_sum("orders", TransactionStatus::Completed.as_str(), members, window)
            .await
            .context("Failed to sum completed orders")
    }

    /// Sums paid commission ledger entries per member.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn sum_paid_commissions(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        self.grouped_sum("commissions", LedgerStatus::Paid.as_str(), members, window)
            .await
            .context("Failed to sum paid commissions")
    }

    /// Sums completed order amounts across every member.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn sum_all_completed_orders(&self, window: Option<&ReportWindow>) -> Result<Decimal> {
        self.overall_sum("orders", TransactionStatus::Completed.as_str(), window)
            .await
            .context("Failed to sum all completed orders")
    }

    /// Sums paid commission ledger entries across every member.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn sum_all_paid_commissions(&self, window: Option<&ReportWindow>) -> Result<Decimal> {
        self.overall_sum("commissions", LedgerStatus::Paid.as_str(), window)
            .await
            .context("Failed to sum all paid commissions")
    }

    async fn overall_sum(
        &self,
        table: &'static str,
        status: &str,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal> {
        let (total,): (Option<Decimal>,) = match window {
            None => {
                let query = format!("SELECT SUM(amount) FROM {table} WHERE status = $1");
                sqlx::query_as(&query)
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            Some(window) => {
                let query = format!(
                    r"
                    SELECT SUM(amount)
                    FROM {table}
                    WHERE status = $1 AND created_at >= $2 AND created_at < $3
                    "
                );
                sqlx::query_as(&query)
                    .bind(status)
                    .bind(window.start)
                    .bind(window.end)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    async fn grouped_sum(
        &self,
        table: &'static str,
        status: &str,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        let members = distinct_ids(members);

        // Table names can't be parameterized; `table` is always a literal above.
        let rows: Vec<(i64, Option<Decimal>)> = match window {
            None => {
                let query = format!(
                    r"
                    SELECT user_id, SUM(amount) AS total
                    FROM {table}
                    WHERE status = $1 AND user_id = ANY($2)
                    GROUP BY user_id
                    "
                );
                sqlx::query_as(&query)
                    .bind(status)
                    .bind(&members)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(window) => {
                let query = format!(
                    r"
                    SELECT user_id, SUM(amount) AS total
                    FROM {table}
                    WHERE status = $1 AND user_id = ANY($2)
                      AND created_at >= $3 AND created_at < $4
                    GROUP BY user_id
                    "
                );
                sqlx::query_as(&query)
                    .bind(status)
                    .bind(&members)
                    .bind(window.start)
                    .bind(window.end)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(member, total)| (member, total.unwrap_or(Decimal::ZERO)))
            .collect())
    }
}

#[async_trait]
impl RevenueLedger for RevenueRepository {
    async fn completed_order_totals(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        self.sum_completed_orders(members, window).await
    }

    async fn paid_commission_totals(
        &self,
        members: &[MemberId],
        window: Option<&ReportWindow>,
    ) -> Result<MemberTotals> {
        self.sum_paid_commissions(members, window).await
    }

    async fn completed_order_grand_total(
        &self,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal> {
        self.sum_all_completed_orders(window).await
    }

    async fn paid_commission_grand_total(
        &self,
        window: Option<&ReportWindow>,
    ) -> Result<Decimal> {
        self.sum_all_paid_commissions(window).await
    }
}
