mod report;
mod serve;

pub use report::{
    run_commissions, run_drilldown, run_search, run_stats, run_tree, CommissionsArgs,
    DrilldownArgs, SearchArgs, StatsArgs, TreeArgs,
};
pub use serve::{run_serve, ServeArgs};

use affiliate_commissions::CommissionEngine;
use affiliate_core::AppConfig;
use affiliate_data::DatabaseClient;
use anyhow::Result;

/// Connects to the configured database and builds an engine over it.
async fn connect_engine(config: &AppConfig) -> Result<(DatabaseClient, CommissionEngine)> {
    let client = DatabaseClient::from_config(&config.database).await?;
    let engine = CommissionEngine::new(client.backing_store(), config.commissions.clone());
    Ok((client, engine))
}
