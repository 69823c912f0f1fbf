//! Reddit Harvester main entry point
//!
//! This is the command-line interface for the submission and comment harvester.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use reddit_harvester::config::{
    load_config_with_hash, parse_date, validate, CollectionMode, Config,
};
use reddit_harvester::harvest;
use reddit_harvester::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Reddit Harvester: a patient submission and comment collector
///
/// Collects a subreddit's submissions day by day over a date range, records
/// their current scores, and saves every comment of every submission as
/// date-sharded CSV files. Network failures are retried until they succeed.
#[derive(Parser, Debug)]
#[command(name = "reddit-harvester")]
#[command(version)]
#[command(about = "A patient submission and comment collector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First day to harvest, YYYY-MM-DD (overrides config)
    #[arg(long, value_name = "DATE")]
    start: Option<String>,

    /// Day after the last day to harvest, YYYY-MM-DD (overrides config)
    #[arg(long, value_name = "DATE")]
    end: Option<String>,

    /// Subreddit to harvest (overrides config)
    #[arg(long)]
    subreddit: Option<String>,

    /// Term that must appear in submission titles (overrides config)
    #[arg(long)]
    search_term: Option<String>,

    /// Field submissions are ranked by within each day (overrides config)
    #[arg(long)]
    sort_type: Option<String>,

    /// Submissions kept per day (overrides config)
    #[arg(long)]
    results_per_day: Option<u32>,

    /// Collection mode (overrides config)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Re-harvest submissions whose comments are already on disk
    #[arg(long)]
    no_resume: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Top,
    All,
}

impl From<ModeArg> for CollectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Top => CollectionMode::Top,
            ModeArg::All => CollectionMode::All,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    apply_overrides(&mut config, &cli)?;
    validate(&config).context("Invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    if let Some(summary) = harvest(config).await.context("Harvest failed")? {
        print_summary(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reddit_harvester=info,warn"),
            1 => EnvFilter::new("reddit_harvester=debug,info"),
            2 => EnvFilter::new("reddit_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    let harvest = &mut config.harvest;

    if let Some(start) = &cli.start {
        harvest.start_date = parse_date(start)?;
    }
    if let Some(end) = &cli.end {
        harvest.end_date = parse_date(end)?;
    }
    if let Some(subreddit) = &cli.subreddit {
        harvest.subreddit = subreddit.clone();
    }
    if let Some(term) = &cli.search_term {
        harvest.search_term = Some(term.clone());
    }
    if let Some(sort_type) = &cli.sort_type {
        harvest.sort_type = sort_type.clone();
    }
    if let Some(limit) = cli.results_per_day {
        harvest.results_per_day = limit;
    }
    if let Some(mode) = cli.mode {
        harvest.mode = mode.into();
    }
    if cli.no_resume {
        harvest.resume = false;
    }

    Ok(())
}

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config) {
    let harvest = &config.harvest;

    println!("=== Reddit Harvester Dry Run ===\n");

    println!("Harvest:");
    println!("  Subreddit: r/{}", harvest.subreddit);
    println!("  Start date: {}", harvest.start_date);
    println!("  End date (exclusive): {}", harvest.end_date);
    if let Some(term) = &harvest.search_term {
        println!("  Search term: {}", term);
    }
    match harvest.mode {
        CollectionMode::Top => println!(
            "  Mode: top {} per day by {}",
            harvest.results_per_day, harvest.sort_type
        ),
        CollectionMode::All => println!("  Mode: all submissions"),
    }
    println!("  Resume: {}", harvest.resume);

    println!("\nSearch API:");
    println!("  Base URL: {}", config.api.search_base_url);
    println!("  User agent: {}", config.api.user_agent);
    println!("  Pacing: {}ms", config.api.pacing_ms);

    println!("\nRetry:");
    println!("  Delay: {}s", config.retry.delay_secs);
    match config.retry.max_attempts {
        0 => println!("  Attempts: unlimited"),
        n => println!("  Attempts: {}", n),
    }

    println!("\nPagination:");
    println!("  Cutoff: {}", config.pagination.cutoff);
    println!("  Page limit: {}", config.pagination.page_limit);

    println!("\nOutput:");
    println!("  Submissions: {}", config.output.submission_path().display());
    println!("  Comments: {}", config.output.comment_root().display());

    println!(
        "\nEnrichment: {}",
        if config.credentials.is_some() {
            "enabled"
        } else {
            "disabled (no credentials)"
        }
    );

    if harvest.end_date <= harvest.start_date {
        println!("\n✗ The end date must be after the start date.");
    } else {
        println!("\n✓ Configuration is valid");
        println!(
            "✓ Would harvest {} days of submissions",
            (harvest.end_date - harvest.start_date).num_days()
        );
    }
}
