//! One-shot reporting commands.

use affiliate_commissions::CommissionReportFormatter;
use affiliate_core::{AppConfig, MemberId, ReportRange};
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct CommissionsArgs {
    /// Member to report on
    #[arg(short, long)]
    pub member: MemberId,

    /// Levels to include (clamped to the configured ceiling)
    #[arg(short, long)]
    pub depth: Option<i64>,

    /// Windowed figure range: week, month, or year
    #[arg(short, long, default_value = "month")]
    pub range: String,

    /// Print JSON instead of the text report
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DrilldownArgs {
    /// Member whose downline is listed
    #[arg(short, long)]
    pub member: MemberId,

    /// Tree level to list (1 = direct referrals)
    #[arg(short, long, default_value_t = 1)]
    pub level: i64,

    /// Page number, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: i64,

    /// Rows per page (clamped to the configured bounds)
    #[arg(long)]
    pub per_page: Option<i64>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Root member of the tree
    #[arg(short, long)]
    pub member: MemberId,

    /// Levels to display
    #[arg(short, long)]
    pub depth: Option<i64>,

    /// Windowed figure range: week, month, or year
    #[arg(short, long, default_value = "month")]
    pub range: String,

    /// Print JSON instead of the indented tree
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Windowed figure range: week, month, or year
    #[arg(short, long, default_value = "month")]
    pub range: String,

    /// Print JSON instead of the text summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Partial username, email, or full name (at least two characters)
    pub query: String,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Prints the commission report for one member.
///
/// # Errors
/// Returns an error if the database is unreachable or a query fails.
pub async fn run_commissions(config: &AppConfig, args: CommissionsArgs) -> Result<()> {
    let (_client, engine) = super::connect_engine(config).await?;
    let range = ReportRange::parse_lenient(&args.range);

    let result = engine.commissions(args.member, args.depth, range).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&*result)?);
    } else {
        println!("{}", CommissionReportFormatter::format(&result));
    }
    Ok(())
}

/// Prints one page of completed transactions at a level.
///
/// # Errors
/// Returns an error if the database is unreachable or a query fails.
pub async fn run_drilldown(config: &AppConfig, args: DrilldownArgs) -> Result<()> {
    let (_client, engine) = super::connect_engine(config).await?;

    let page = engine
        .drilldown(args.member, args.level, args.page, args.per_page)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        print!(
            "{}",
            CommissionReportFormatter::format_drilldown(
                &page,
                engine.settings().clamp_depth(args.level),
                args.page.max(1),
            )
        );
    }
    Ok(())
}

/// Prints a member's network tree.
///
/// # Errors
/// Returns an error if the database is unreachable or a query fails.
pub async fn run_tree(config: &AppConfig, args: TreeArgs) -> Result<()> {
    let (_client, engine) = super::connect_engine(config).await?;
    let range = ReportRange::parse_lenient(&args.range);

    let Some(tree) = engine.network_tree(args.member, args.depth, range).await? else {
        anyhow::bail!("Member {} not found", args.member);
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!(
            "{}",
            CommissionReportFormatter::format_network(&tree, &config.commissions.currency_symbol)
        );
    }
    Ok(())
}

/// Prints membership-wide network statistics.
///
/// # Errors
/// Returns an error if the database is unreachable or a query fails.
pub async fn run_stats(config: &AppConfig, args: StatsArgs) -> Result<()> {
    let (_client, engine) = super::connect_engine(config).await?;
    let range = ReportRange::parse_lenient(&args.range);

    let stats = engine.network_stats(range).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!(
            "{}",
            CommissionReportFormatter::format_stats(&stats, &config.commissions.currency_symbol)
        );
    }
    Ok(())
}

/// Prints members matching a partial name or email.
///
/// # Errors
/// Returns an error if the database is unreachable or the lookup fails.
pub async fn run_search(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let (_client, engine) = super::connect_engine(config).await?;

    let users = engine.search_members(&args.query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else {
        print!("{}", CommissionReportFormatter::format_matches(&users));
    }
    Ok(())
}
