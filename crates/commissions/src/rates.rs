//! Per-level commission rates.
//!
//! Rates are fractions of revenue, ordered by level (index 0 is level 1).
//! The table is loaded once and shared read-only until explicitly
//! invalidated. A failed load degrades to an empty table, so every level
//! earns zero instead of failing the request.

use affiliate_core::RateSource;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct RateTable {
    source: Arc<dyn RateSource>,
    cached: RwLock<Option<Arc<Vec<Decimal>>>>,
}

impl RateTable {
    #[must_use]
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Returns the cached rates, loading them on first use.
    ///
    /// Concurrent cold loads may both hit the source; they produce the same
    /// table and the last one wins.
    pub async fn rates(&self) -> Arc<Vec<Decimal>> {
        if let Some(rates) = self.cached.read().await.as_ref() {
            return Arc::clone(rates);
        }

        match self.source.load_rates().await {
            Ok(rates) => {
                debug!(levels = rates.len(), "Loaded commission rates");
                let rates = Arc::new(rates);
                *self.cached.write().await = Some(Arc::clone(&rates));
                rates
            }
            Err(e) => {
                warn!(error = %e, "Failed to load commission rates, using empty rate table");
                Arc::new(Vec::new())
            }
        }
    }

    /// Drops the cached table; the next access reloads it.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
        debug!("Commission rate cache invalidated");
    }
}

/// Rate for a 1-based level, zero when the level is not configured.
#[must_use]
pub fn rate_for_level(rates: &[Decimal], level: usize) -> Decimal {
    level
        .checked_sub(1)
        .and_then(|idx| rates.get(idx))
        .copied()
        .unwrap_or(Decimal::ZERO)
}

/// Renders a fractional rate as a percent label: `0.05` -> `"5%"`, `0.125` -> `"12.5%"`.
///
/// Whole percentages have no decimal point; others keep at most two
/// decimals with trailing zeros trimmed.
#[must_use]
pub fn format_rate(rate: Decimal) -> String {
    let pct = rate * Decimal::ONE_HUNDRED;
    if pct.is_zero() {
        return "0%".to_string();
    }
    if pct.fract().is_zero() {
        return format!("{}%", pct.trunc().normalize());
    }
    let rounded = pct
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{rounded}%")
}
