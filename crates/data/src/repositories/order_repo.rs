//! Order repository.
//!
//! Paginated listing of completed orders for level drill-down.

use affiliate_core::{MemberId, TransactionRecord, TransactionSource, TransactionStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::distinct_ids;

/// Repository for order listings.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queries one page of completed orders owned by `owners`, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_completed_page(
        &self,
        owners: &[MemberId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        let owners = distinct_ids(owners);
        let rows = sqlx::query(
            r"
            SELECT o.id, o.user_id, u.username, o.amount, o.status, o.created_at
            FROM orders o
            JOIN users u ON u.id = o.user_id
            WHERE o.status = $1 AND o.user_id = ANY($2)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(TransactionStatus::Completed.as_str())
        .bind(&owners)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query completed orders")?;

        rows.iter().map(transaction_from_row).collect()
    }

    /// Counts completed orders owned by `owners`.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count_completed_for(&self, owners: &[MemberId]) -> Result<i64> {
        let owners = distinct_ids(owners);
        let (count,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM orders
            WHERE status = $1 AND user_id = ANY($2)
            ",
        )
        .bind(TransactionStatus::Completed.as_str())
        .bind(&owners)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count completed orders")?;

        Ok(count)
    }
}

fn transaction_from_row(row: &PgRow) -> Result<TransactionRecord> {
    let raw_status: String = row.try_get("status")?;
    let status = TransactionStatus::parse(&raw_status)
        .with_context(|| format!("Unknown order status '{raw_status}'"))?;

    Ok(TransactionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        amount: row.try_get("amount")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl TransactionSource for OrderRepository {
    async fn completed_transactions(
        &self,
        owners: &[MemberId],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionRecord>> {
        self.query_completed_page(owners, limit, offset).await
    }

    async fn count_completed(&self, owners: &[MemberId]) -> Result<i64> {
        self.count_completed_for(owners).await
    }
}
