//! Newswire main entry point
//!
//! This is the command-line interface for the Newswire news-site crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use newswire::config::{load_config_with_hash, Config, WebsiteConfig};
use newswire::crawler::Coordinator;
use newswire::output::{
    load_statistics, print_crawl_report, print_hash_check, print_run_summary, print_statistics,
};
use newswire::storage::{lock, open_shared, SharedStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Newswire: an incremental news-site crawler
///
/// Newswire reads a news site's sitemaps, resolves its category tree,
/// extracts every article and stores only what changed since the last run.
#[derive(Parser, Debug)]
#[command(name = "newswire")]
#[command(version)]
#[command(about = "An incremental news-site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Website id to crawl (defaults to the first configured website)
    #[arg(long, global = true)]
    website: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every sitemap and record its article URLs
    Sitemaps,
    /// Fetch the category sitemap and resolve the category tree
    Categories,
    /// Extract every recorded article and save the changed ones
    Articles,
    /// Run sitemaps, categories and articles in order
    All,
    /// Show statistics from the database and exit
    Stats,
    /// Extract one article twice and compare the content hashes
    Hash {
        /// Article URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let Some(website) = config.website(cli.website).cloned() else {
        bail!(newswire::ConfigError::UnknownWebsite(cli.website.unwrap_or_default()));
    };

    // A storage failure at startup is fatal
    let storage = open_shared(Path::new(&config.database.path))
        .with_context(|| format!("Failed to open database {}", config.database.path))?;

    handle_command(&config, &website, storage, cli.command).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newswire=info,warn"),
            1 => EnvFilter::new("newswire=debug,info"),
            2 => EnvFilter::new("newswire=trace,debug"),
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

/// Handles the stats command: shows statistics from the database
fn handle_stats(storage: &SharedStorage, website: &WebsiteConfig) -> anyhow::Result<()> {
    let guard = lock(storage)?;
    let stats = load_statistics(&*guard, website.id)?;
    print_statistics(&website.name, &stats);
    Ok(())
}

/// Builds a coordinator for one of the crawl commands
async fn coordinator(
    config: &Config,
    website: &WebsiteConfig,
    storage: &SharedStorage,
) -> anyhow::Result<Coordinator> {
    tracing::info!(
        "Website: {} (id {}), sitemaps {}..={}",
        website.name,
        website.id,
        website.start_index,
        website.end_index
    );
    Ok(Coordinator::new(config, website, Arc::clone(storage)).await?)
}

/// Dispatches a command
async fn handle_command(
    config: &Config,
    website: &WebsiteConfig,
    storage: SharedStorage,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Stats => handle_stats(&storage, website)?,
        Command::Sitemaps => {
            let summary = coordinator(config, website, &storage)
                .await?
                .run_sitemaps()
                .await;
            print_run_summary("Sitemaps", &summary);
        }
        Command::Categories => {
            let report = coordinator(config, website, &storage)
                .await?
                .run_categories()
                .await?;
            println!("Categories: {} saved, {} skipped", report.saved, report.skipped);
        }
        Command::Articles => {
            let summary = coordinator(config, website, &storage)
                .await?
                .run_articles()
                .await?;
            print_run_summary("Articles", &summary);
        }
        Command::All => {
            let report = coordinator(config, website, &storage)
                .await?
                .run_all()
                .await?;
            print_crawl_report(&report);
        }
        Command::Hash { url } => {
            let check = coordinator(config, website, &storage)
                .await?
                .hash_check(&url)
                .await?;
            print_hash_check(&check);
        }
    }

    Ok(())
}
