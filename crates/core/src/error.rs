//! Error types for configuration validation.

use thiserror::Error;

/// A loaded configuration that parses but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The depth ceiling must allow at least one level.
    #[error("commissions.max_depth must be at least 1")]
    ZeroDepthCeiling,

    /// Page size lower bound must be positive.
    #[error("commissions.per_page_min must be at least 1, got {0}")]
    PerPageMin(i64),

    /// Page size bounds are inverted.
    #[error("commissions.per_page_min ({min}) exceeds commissions.per_page_max ({max})")]
    PerPageBounds {
        /// Configured lower bound.
        min: i64,
        /// Configured upper bound.
        max: i64,
    },
}
