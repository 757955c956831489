use clap::{Parser, Subcommand};

mod commands;

use commands::{CommissionsArgs, DrilldownArgs, SearchArgs, ServeArgs, StatsArgs, TreeArgs};

#[derive(Parser, Debug)]
#[command(name = "affiliate")]
#[command(about = "Multi-level referral commission engine", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = affiliate_core::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Config profile merged over the base file (Config.<profile>.toml)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Database URL, overriding the configured one
    #[arg(long, global = true, env = "DATABASE_URL")]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web API server
    Serve(ServeArgs),
    /// Print the commission report for a member
    Commissions(CommissionsArgs),
    /// List completed transactions at one level of a member's downline
    Drilldown(DrilldownArgs),
    /// Print a member's network tree
    Tree(TreeArgs),
    /// Print membership-wide network statistics
    Stats(StatsArgs),
    /// Find members by partial username, email, or full name
    Search(SearchArgs),
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<affiliate_core::AppConfig> {
        let mut config =
            affiliate_core::ConfigLoader::load_from(&self.config, self.profile.as_deref())?;
        if let Some(url) = &self.db_url {
            config.database.url.clone_from(url);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = cli.load_config()?;

    match cli.command {
        Commands::Serve(args) => commands::run_serve(&config, args).await?,
        Commands::Commissions(args) => commands::run_commissions(&config, args).await?,
        Commands::Drilldown(args) => commands::run_drilldown(&config, args).await?,
        Commands::Tree(args) => commands::run_tree(&config, args).await?,
        Commands::Stats(args) => commands::run_stats(&config, args).await?,
        Commands::Search(args) => commands::run_search(&config, args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_defaults() {
        let cli = Cli::try_parse_from(["affiliate", "serve"]).unwrap();

        assert_eq!(cli.config, "config/Config.toml");
        assert!(cli.profile.is_none());
        match cli.command {
            Commands::Serve(args) => assert!(args.addr.is_none()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_commissions_options() {
        let cli = Cli::try_parse_from([
            "affiliate",
            "commissions",
            "--member",
            "42",
            "--depth",
            "3",
            "--range",
            "week",
            "--json",
            "--profile",
            "prod",
        ])
        .unwrap();

        assert_eq!(cli.profile.as_deref(), Some("prod"));
        match cli.command {
            Commands::Commissions(args) => {
                assert_eq!(args.member, 42);
                assert_eq!(args.depth, Some(3));
                assert_eq!(args.range, "week");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_drilldown_paging() {
        let cli = Cli::try_parse_from([
            "affiliate",
            "drilldown",
            "--member",
            "7",
            "--level",
            "2",
            "--page",
            "3",
            "--per-page",
            "25",
        ])
        .unwrap();

        match cli.command {
            Commands::Drilldown(args) => {
                assert_eq!(args.member, 7);
                assert_eq!(args.level, 2);
                assert_eq!(args.page, 3);
                assert_eq!(args.per_page, Some(25));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn tree_requires_member() {
        assert!(Cli::try_parse_from(["affiliate", "tree"]).is_err());

        let cli = Cli::try_parse_from(["affiliate", "tree", "--member", "1"]).unwrap();
        match cli.command {
            Commands::Tree(args) => {
                assert_eq!(args.member, 1);
                assert!(args.depth.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_stats_and_search() {
        let cli = Cli::try_parse_from(["affiliate", "stats", "--range", "year"]).unwrap();
        match cli.command {
            Commands::Stats(args) => {
                assert_eq!(args.range, "year");
                assert!(!args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["affiliate", "search", "ana", "--json"]).unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "ana");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
