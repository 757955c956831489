pub mod config;
pub mod config_loader;
pub mod error;
pub mod models;
pub mod traits;
pub mod window;

pub use config::{AppConfig, CommissionSettings, DatabaseConfig, ServerConfig};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use error::ConfigError;
pub use models::{
    LedgerStatus, LevelCount, MemberCensus, MemberId, MemberRecord, Referral,
    TransactionRecord, TransactionStatus, ACTIVE_STATUS,
};
pub use traits::{
    BackingStore, MemberDirectory, MemberTotals, RateSource, ReferralGraph, RevenueLedger,
    TransactionSource,
};
pub use window::{ReportRange, ReportWindow};
