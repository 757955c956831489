//! Commission rate repository.

use affiliate_core::RateSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Repository for the per-level commission rate table.
#[derive(Debug, Clone)]
pub struct CommissionRateRepository {
    pool: PgPool,
}

impl CommissionRateRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets all configured rates ordered by level.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_all(&self) -> Result<Vec<(i32, Decimal)>> {
        let rows = sqlx::query_as::<_, (i32, Decimal)>(
            r"
            SELECT level, rate
            FROM commission_rates
            ORDER BY level ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query commission rates")?;

        Ok(rows)
    }
}

#[async_trait]
impl RateSource for CommissionRateRepository {
    async fn load_rates(&self) -> Result<Vec<Decimal>> {
        let rows = self.query_all().await?;
        Ok(rates_by_level(&rows))
    }
}

/// Lays rates out by level, index 0 being level 1. Missing levels get a zero
/// rate; rows with a level below 1 are ignored.
fn rates_by_level(rows: &[(i32, Decimal)]) -> Vec<Decimal> {
    let mut rates = Vec::new();
    for (level, rate) in rows {
        let Some(idx) = usize::try_from(*level).ok().and_then(|l| l.checked_sub(1)) else {
            tracing::warn!(level, "Ignoring commission rate with invalid level");
            continue;
        };
        if rates.len() <= idx {
            rates.resize(idx + 1, Decimal::ZERO);
        }
        rates[idx] = *rate;
    }
    rates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rates_are_indexed_by_level() {
        let rows = vec![(1, dec!(0.10)), (2, dec!(0.05)), (3, dec!(0.02))];
        assert_eq!(rates_by_level(&rows), vec![dec!(0.10), dec!(0.05), dec!(0.02)]);
    }

    #[test]
    fn gaps_are_zero_and_invalid_levels_skipped() {
        let rows = vec![(0, dec!(0.50)), (1, dec!(0.10)), (4, dec!(0.01))];
        assert_eq!(
            rates_by_level(&rows),
            vec![dec!(0.10), Decimal::ZERO, Decimal::ZERO, dec!(0.01)]
        );
    }
}
