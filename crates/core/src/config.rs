use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub commissions: CommissionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tunables for commission computation, caching, and drill-down paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionSettings {
    /// Hard ceiling on tree depth. Requested depths and levels are clamped to `[1, max_depth]`.
    pub max_depth: usize,
    /// Depth used when the caller does not ask for one.
    pub default_depth: usize,
    /// Depth of the nested network tree when the caller does not ask for one.
    pub network_depth: usize,
    /// Validity window of a cached commission result.
    pub cache_ttl_secs: u64,
    /// Interval between sweeps of expired cache entries.
    pub cache_sweep_secs: u64,
    pub default_currency: String,
    pub currency_symbol: String,
    /// Conversion fee, in percent, reported alongside every result.
    pub conversion_rate: Decimal,
    pub per_page: i64,
    pub per_page_min: i64,
    pub per_page_max: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/affiliate".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for CommissionSettings {
    fn default() -> Self {
        Self {
            max_depth: 9,
            default_depth: 9,
            network_depth: 3,
            cache_ttl_secs: 300,
            cache_sweep_secs: 60,
            default_currency: "PHP".to_string(),
            currency_symbol: "P".to_string(),
            conversion_rate: Decimal::new(40, 1),
            per_page: 50,
            per_page_min: 10,
            per_page_max: 200,
        }
    }
}

impl AppConfig {
    /// Checks cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.commissions.validate()
    }
}

impl CommissionSettings {
    /// Checks that depth and paging bounds are usable.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepthCeiling);
        }
        if self.per_page_min < 1 {
            return Err(ConfigError::PerPageMin(self.per_page_min));
        }
        if self.per_page_min > self.per_page_max {
            return Err(ConfigError::PerPageBounds {
                min: self.per_page_min,
                max: self.per_page_max,
            });
        }
        Ok(())
    }

    /// Clamps a requested depth (or level) into `[1, max_depth]`.
    #[must_use]
    pub fn clamp_depth(&self, requested: i64) -> usize {
        let ceiling = self.max_depth.max(1);
        usize::try_from(requested.max(1)).map_or(ceiling, |depth| depth.min(ceiling))
    }

    /// Clamps a requested page size into `[per_page_min, per_page_max]`.
    #[must_use]
    pub fn clamp_per_page(&self, requested: i64) -> i64 {
        requested.clamp(self.per_page_min, self.per_page_max.max(self.per_page_min))
    }

    #[must_use]
    pub fn cache_ttl(&self) -> chrono::Duration {
        // chrono panics above i64::MAX milliseconds
        let max_secs = i64::MAX / 1_000;
        chrono::Duration::seconds(
            i64::try_from(self.cache_ttl_secs).map_or(max_secs, |secs| secs.min(max_secs)),
        )
    }
}
