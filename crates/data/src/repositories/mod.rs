//! Database repositories for the affiliate commission engine.
//!
//! Each repository provides typed, read-only access to one table and
//! implements the matching storage trait from `affiliate-core`. Member sets
//! are bound as a single `BIGINT[]` parameter so every batched lookup is one
//! statement.

pub mod member_repo;
pub mod order_repo;
pub mod rate_repo;
pub mod revenue_repo;

pub use member_repo::MemberRepository;
pub use order_repo::OrderRepository;
pub use rate_repo::CommissionRateRepository;
pub use revenue_repo::RevenueRepository;

use affiliate_core::BackingStore;
use sqlx::PgPool;
use std::sync::Arc;

/// Creates all repositories from a single database pool.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub members: MemberRepository,
    pub orders: OrderRepository,
    pub revenue: RevenueRepository,
    pub rates: CommissionRateRepository,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            members: MemberRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            revenue: RevenueRepository::new(pool.clone()),
            rates: CommissionRateRepository::new(pool),
        }
    }

    /// Wires the repositories into the engine's storage handles.
    #[must_use]
    pub fn backing_store(&self) -> BackingStore {
        let members = Arc::new(self.members.clone());
        BackingStore {
            referrals: members.clone(),
            revenue: Arc::new(self.revenue.clone()),
            rates: Arc::new(self.rates.clone()),
            members,
            transactions: Arc::new(self.orders.clone()),
        }
    }
}

/// Deduplicated copy of an identifier set, in ascending order.
pub(crate) fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_sorts_and_dedups() {
        assert_eq!(distinct_ids(&[5, 1, 5, 3, 1]), vec![1, 3, 5]);
        assert!(distinct_ids(&[]).is_empty());
    }
}
