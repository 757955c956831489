//! Time-bounded cache of computed commission results.
//!
//! Entries are keyed by `(member, depth)` and are immutable once stored; a
//! recomputation replaces the entry. Concurrent misses on one key may both
//! compute, and the last write wins.

use affiliate_core::{MemberId, ReportWindow};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::calculator::{CommissionCalculator, CommissionResult};
use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub member: MemberId,
    pub depth: usize,
}

#[derive(Debug)]
pub struct CacheEntry {
    pub result: Arc<CommissionResult>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Fresh while `age <= ttl`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

pub struct ResultCache {
    calculator: Arc<CommissionCalculator>,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
}

impl ResultCache {
    #[must_use]
    pub fn new(calculator: Arc<CommissionCalculator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            calculator,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stored result for `(root, depth)` while it is younger
    /// than `ttl`, otherwise computes, stores, and returns a new one.
    ///
    /// # Errors
    /// Returns an error if recomputation fails; nothing is stored then.
    pub async fn get_or_compute(
        &self,
        root: MemberId,
        depth: usize,
        window: &ReportWindow,
        ttl: Duration,
    ) -> Result<Arc<CommissionResult>> {
        let key = CacheKey { member: root, depth };

        let cached = self.entries.read().await.get(&key).cloned();
        if let Some(entry) = cached {
            let now = self.clock.now();
            if entry.is_fresh(now, ttl) {
                debug!(
                    member = root,
                    depth,
                    age_secs = entry.age(now).num_seconds(),
                    "Commission cache hit"
                );
                return Ok(Arc::clone(&entry.result));
            }
        }

        debug!(member = root, depth, "Commission cache miss");
        let result = Arc::new(self.calculator.compute(root, depth, window).await?);
        let entry = Arc::new(CacheEntry {
            result: Arc::clone(&result),
            created_at: self.clock.now(),
        });
        self.entries.write().await.insert(key, entry);

        Ok(result)
    }

    /// Drops the entry for `(root, depth)`. Returns whether one existed.
    pub async fn invalidate(&self, root: MemberId, depth: usize) -> bool {
        self.entries
            .write()
            .await
            .remove(&CacheKey { member: root, depth })
            .is_some()
    }

    /// Drops every entry older than `ttl`. Returns how many were removed.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, ttl));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, remaining = entries.len(), "Purged expired commission results");
        }
        purged
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
