pub mod amounts;
pub mod cache;
pub mod calculator;
pub mod clock;
pub mod drilldown;
pub mod engine;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod network;
pub mod rates;
pub mod report;
pub mod search;
pub mod stats;
pub mod tree;

pub use amounts::{AmountAggregator, AmountSource, AmountSummary};
pub use cache::{CacheEntry, CacheKey, ResultCache};
pub use calculator::{CommissionCalculator, CommissionResult, CurrencyInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use drilldown::{DrilldownPage, DrilldownService, PageRequest};
pub use engine::CommissionEngine;
#[cfg(any(test, feature = "testing"))]
pub use memory::{InMemoryStore, QueryCounts};
pub use network::{NetworkNode, NetworkTreeBuilder};
pub use rates::{format_rate, rate_for_level, RateTable};
pub use report::CommissionReportFormatter;
pub use search::{MemberMatch, MemberSearch, MAX_RESULTS, MIN_QUERY_CHARS};
pub use stats::{NetworkStats, NetworkStatsService};
pub use tree::{TreeGatherer, TreeLevels};
